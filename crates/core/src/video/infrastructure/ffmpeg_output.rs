use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ffmpeg_next::format::Pixel as FfmpegPixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use crate::shared::constants::{DEFAULT_FRAME_RATE, DEFAULT_TIME_BASE};
use crate::shared::error::VideoError;
use crate::shared::media_time::MediaTime;
use crate::shared::native_format::NativeFormat;
use crate::video::domain::encode_target::{
    CompletionFn, EncodeSession, EncodeTarget, RawBufferMut,
};

/// `AVERROR(ENOMEM)`.
const AVERROR_ENOMEM: i32 = -12;
/// `AVERROR(EINVAL)`.
const AVERROR_EINVAL: i32 = -22;

/// Video codecs the ffmpeg backend can encode with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// MPEG-4 part 2 over YUV 4:2:0. Lossy, plays almost everywhere.
    #[default]
    Mpeg4,
    /// FFV1, encoded in the native pixel format. Lossless; use a `.mkv`
    /// container.
    Ffv1,
}

impl VideoCodec {
    fn id(self) -> ffmpeg_next::codec::Id {
        match self {
            Self::Mpeg4 => ffmpeg_next::codec::Id::MPEG4,
            Self::Ffv1 => ffmpeg_next::codec::Id::FFV1,
        }
    }

    fn encoder_format(self, native: NativeFormat) -> FfmpegPixel {
        match self {
            Self::Mpeg4 => FfmpegPixel::YUV420P,
            Self::Ffv1 => native.to_ffmpeg(),
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mpeg4 => write!(f, "mpeg4"),
            Self::Ffv1 => write!(f, "ffv1"),
        }
    }
}

impl FromStr for VideoCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mpeg4" => Ok(Self::Mpeg4),
            "ffv1" => Ok(Self::Ffv1),
            other => Err(format!("unknown codec '{other}' (expected mpeg4 or ffv1)")),
        }
    }
}

/// How an [`FfmpegOutput`] configures its encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderSettings {
    pub codec: VideoCodec,
    /// Ticks per second of the encoder clock. Frame times are rounded to
    /// the nearest tick, and each frame needs a tick of its own: at the
    /// default 600, frames less than about 1.7 ms apart are rejected with
    /// [`VideoError::Encode`].
    pub time_base: i32,
    /// Nominal frame rate written to the stream header.
    pub frame_rate: i32,
    pub bit_rate: Option<usize>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::default(),
            time_base: DEFAULT_TIME_BASE,
            frame_rate: DEFAULT_FRAME_RATE,
            bit_rate: None,
        }
    }
}

/// A video file written through ffmpeg-next. The container is picked from
/// the path's extension.
#[derive(Clone, Debug)]
pub struct FfmpegOutput {
    path: PathBuf,
    settings: EncoderSettings,
}

impl FfmpegOutput {
    pub fn new(path: impl AsRef<Path>, settings: EncoderSettings) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            settings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }
}

impl EncodeTarget for FfmpegOutput {
    fn open_encode_session(
        &self,
        width: u32,
        height: u32,
        format: NativeFormat,
    ) -> Result<Box<dyn EncodeSession>, VideoError> {
        ffmpeg_next::init().map_err(VideoError::encode_session)?;
        let settings = self.settings;

        let mut octx =
            ffmpeg_next::format::output(&self.path).map_err(VideoError::encode_session)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(settings.codec.id()).ok_or_else(|| {
            VideoError::EncodeSession {
                code: ffmpeg_next::Error::EncoderNotFound.into(),
                message: format!("{} encoder not found", settings.codec),
            }
        })?;

        let mut ost = octx
            .add_stream(Some(codec))
            .map_err(VideoError::encode_session)?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(VideoError::encode_session)?;

        let encoder_format = settings.codec.encoder_format(format);
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(encoder_format);
        encoder_ctx.set_time_base(Rational(1, settings.time_base));
        encoder_ctx.set_frame_rate(Some(Rational(settings.frame_rate, 1)));
        if let Some(bit_rate) = settings.bit_rate {
            encoder_ctx.set_bit_rate(bit_rate);
        }

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .map_err(VideoError::encode_session)?;
        ost.set_parameters(&encoder);

        octx.write_header().map_err(VideoError::encode_session)?;
        let stream_time_base = octx
            .stream(0)
            .map(|stream| stream.time_base())
            .unwrap_or(Rational(1, settings.time_base));

        let scaler = if encoder_format == format.to_ffmpeg() {
            None
        } else {
            Some(
                scaling::Context::get(
                    format.to_ffmpeg(),
                    width,
                    height,
                    encoder_format,
                    width,
                    height,
                    scaling::Flags::BILINEAR,
                )
                .map_err(VideoError::encode_session)?,
            )
        };

        let native = Video::new(format.to_ffmpeg(), width, height);
        if native.planes() == 0 {
            return Err(VideoError::PixelBufferAllocation(AVERROR_ENOMEM));
        }

        log::info!(
            "Opened {} encoder for {} ({width}x{height}, {format} -> {encoder_format:?})",
            settings.codec,
            self.path.display()
        );

        Ok(Box::new(FfmpegEncodeSession {
            path: self.path.clone(),
            octx,
            encoder,
            scaler,
            native,
            width,
            height,
            format,
            time_base: settings.time_base,
            stream_time_base,
            start_tick: 0,
            last_tick: None,
            pending: None,
            frame_count: 0,
        }))
    }
}

struct FfmpegEncodeSession {
    path: PathBuf,
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: Option<scaling::Context>,
    native: Video,
    width: u32,
    height: u32,
    format: NativeFormat,
    time_base: i32,
    stream_time_base: Rational,
    /// Session start in encoder ticks; written timestamps are relative to it.
    start_tick: i64,
    last_tick: Option<i64>,
    /// Newest encoded packet, held back so the final one can be given a
    /// duration that ends the track at the session end time.
    pending: Option<ffmpeg_next::Packet>,
    frame_count: usize,
}

// Safety: FfmpegEncodeSession is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegEncodeSession {}

impl FfmpegEncodeSession {
    fn write_packets(&mut self) -> Result<(), ffmpeg_next::Error> {
        loop {
            let mut encoded = ffmpeg_next::Packet::empty();
            if self.encoder.receive_packet(&mut encoded).is_err() {
                return Ok(());
            }
            if let Some(previous) = self.pending.replace(encoded) {
                self.mux(previous)?;
            }
        }
    }

    fn mux(&mut self, mut packet: ffmpeg_next::Packet) -> Result<(), ffmpeg_next::Error> {
        packet.set_stream(0);
        packet.rescale_ts(Rational(1, self.time_base), self.stream_time_base);
        packet.write_interleaved(&mut self.octx)
    }

    fn flush(&mut self, end: MediaTime) -> Result<(), VideoError> {
        self.encoder.send_eof().map_err(VideoError::finalize)?;
        self.write_packets().map_err(VideoError::finalize)?;

        let end_tick = end.rescale(self.time_base) - self.start_tick;
        if let Some(mut last) = self.pending.take() {
            if let Some(pts) = last.pts() {
                if end_tick > pts {
                    last.set_duration(end_tick - pts);
                }
            }
            self.mux(last).map_err(VideoError::finalize)?;
        }

        self.octx.write_trailer().map_err(VideoError::finalize)?;
        log::info!(
            "Wrote {} frames to {} (ends at {:.3}s)",
            self.frame_count,
            self.path.display(),
            end.seconds()
        );
        Ok(())
    }
}

impl EncodeSession for FfmpegEncodeSession {
    fn start(&mut self, at: MediaTime) -> Result<(), VideoError> {
        self.start_tick = at.rescale(self.time_base);
        log::debug!("Encode session for {} starts at {at}", self.path.display());
        Ok(())
    }

    fn writable_buffer(&mut self) -> Result<RawBufferMut<'_>, VideoError> {
        let stride = self.native.stride(0);
        Ok(RawBufferMut::new(
            self.native.data_mut(0),
            self.width,
            self.height,
            stride,
            self.format,
        ))
    }

    fn append_buffer(&mut self, at: MediaTime) -> Result<(), VideoError> {
        let tick = at.rescale(self.time_base) - self.start_tick;
        if let Some(last) = self.last_tick.filter(|&last| tick <= last) {
            return Err(VideoError::Encode {
                code: AVERROR_EINVAL,
                message: format!(
                    "frame at {:.6}s falls on tick {tick}, not after tick {last} (time base 1/{})",
                    at.seconds(),
                    self.time_base
                ),
            });
        }

        // The encoder may hold on to the frames it is sent, so each one gets
        // its own buffer and `native` stays free for the next write.
        let mut frame = match self.scaler.as_mut() {
            Some(scaler) => {
                let mut converted = Video::empty();
                scaler
                    .run(&self.native, &mut converted)
                    .map_err(VideoError::encode)?;
                converted
            }
            None => self.native.clone(),
        };
        frame.set_pts(Some(tick));

        self.encoder.send_frame(&frame).map_err(VideoError::encode)?;
        self.last_tick = Some(tick);
        self.write_packets().map_err(VideoError::encode)?;
        self.frame_count += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>, end: MediaTime, on_complete: CompletionFn) {
        std::thread::spawn(move || {
            let result = self.flush(end);
            if let Err(e) = &result {
                log::error!("Finalizing {} failed: {e}", self.path.display());
            }
            on_complete(result);
        });
    }
}
