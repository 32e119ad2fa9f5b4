use std::path::{Path, PathBuf};

use ffmpeg_next::format::stream::Disposition;
use ffmpeg_next::format::Pixel as FfmpegPixel;
use ffmpeg_next::media::Type as MediaType;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::error::VideoError;
use crate::shared::native_format::NativeFormat;
use crate::video::domain::video_asset::{DecodeSession, RawBuffer, VideoAsset};

/// A video file read through ffmpeg-next (libavformat + libavcodec).
///
/// Holds only the path; every decode session reopens the container.
#[derive(Clone, Debug)]
pub struct FfmpegAsset {
    path: PathBuf,
}

impl FfmpegAsset {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, VideoError> {
        ffmpeg_next::init().map_err(VideoError::decode_session)?;
        ffmpeg_next::format::input(&self.path).map_err(VideoError::decode_session)
    }
}

impl VideoAsset for FfmpegAsset {
    fn video_track_count(&self) -> Result<usize, VideoError> {
        let ictx = self.open_input()?;
        Ok(ictx
            .streams()
            .filter(|stream| is_video_track(stream.parameters().medium(), stream.disposition()))
            .count())
    }

    fn open_decode_session(
        &self,
        format: NativeFormat,
    ) -> Result<Box<dyn DecodeSession>, VideoError> {
        let ictx = self.open_input()?;

        let stream = ictx
            .streams()
            .find(|stream| is_video_track(stream.parameters().medium(), stream.disposition()))
            .ok_or(VideoError::NoVideoTrack)?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(VideoError::decode_session)?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(VideoError::decode_session)?;

        log::debug!(
            "Opened decode session for {} (stream {stream_index}, {}x{}, {})",
            self.path.display(),
            decoder.width(),
            decoder.height(),
            format
        );

        Ok(Box::new(FfmpegDecodeSession {
            ictx,
            decoder,
            stream_index,
            format,
            scaler: None,
            decoded: Video::empty(),
            converted: Video::empty(),
            output_converted: false,
            flushing: false,
            done: false,
        }))
    }
}

/// Video streams carrying a single attached picture (cover art) are not
/// tracks.
fn is_video_track(medium: MediaType, disposition: Disposition) -> bool {
    medium == MediaType::Video && !disposition.contains(Disposition::ATTACHED_PIC)
}

/// Decodes one traversal lazily, a packet at a time.
///
/// Frames already in the requested native format are exposed as decoded;
/// others go through a scaler that is rebuilt whenever the decoded
/// geometry or format changes.
struct FfmpegDecodeSession {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    stream_index: usize,
    format: NativeFormat,
    scaler: Option<(ScalerKey, scaling::Context)>,
    decoded: Video,
    converted: Video,
    output_converted: bool,
    flushing: bool,
    done: bool,
}

type ScalerKey = (FfmpegPixel, u32, u32);

// Safety: FfmpegDecodeSession is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegDecodeSession {}

impl FfmpegDecodeSession {
    /// Advances to the next decoded frame. Returns `false` at end of stream.
    fn decode_next(&mut self) -> bool {
        if self.done {
            return false;
        }

        loop {
            match self.try_receive() {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Stopping decode after conversion failure: {e}");
                    self.done = true;
                    return false;
                }
            }

            if self.flushing {
                self.done = true;
                return false;
            }

            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                continue;
            };

            if stream.index() != self.stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::warn!("Skipping undecodable packet: {e}");
            }
        }
    }

    fn try_receive(&mut self) -> Result<bool, ffmpeg_next::Error> {
        if self.decoder.receive_frame(&mut self.decoded).is_err() {
            return Ok(false);
        }

        let target = self.format.to_ffmpeg();
        if self.decoded.format() == target {
            self.output_converted = false;
            return Ok(true);
        }

        let key = (
            self.decoded.format(),
            self.decoded.width(),
            self.decoded.height(),
        );
        let stale = self
            .scaler
            .as_ref()
            .map_or(true, |(cached, _)| *cached != key);
        if stale {
            let (format, width, height) = key;
            let scaler = scaling::Context::get(
                format,
                width,
                height,
                target,
                width,
                height,
                scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some((key, scaler));
            self.converted = Video::empty();
        }
        if let Some((_, scaler)) = self.scaler.as_mut() {
            scaler.run(&self.decoded, &mut self.converted)?;
        }
        self.output_converted = true;
        Ok(true)
    }

    fn output(&self) -> RawBuffer<'_> {
        let frame = if self.output_converted {
            &self.converted
        } else {
            &self.decoded
        };
        RawBuffer::new(
            frame.data(0),
            frame.width(),
            frame.height(),
            frame.stride(0),
            self.format,
        )
    }
}

impl DecodeSession for FfmpegDecodeSession {
    fn pull_next_buffer(&mut self) -> Option<RawBuffer<'_>> {
        if !self.decode_next() {
            return None;
        }
        Some(self.output())
    }
}
