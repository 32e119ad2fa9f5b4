//! Typed, frame-by-frame access to video files.
//!
//! A [`FrameSource`] exposes a video track as a restartable sequence of
//! [`Image`]s of one pixel type; a [`FrameSink`] encodes such images back
//! into a track. Both talk to a platform backend through the traits in
//! [`video::domain`]: ffmpeg for files, or the in-memory backend.

pub mod shared;
pub mod video;

use std::path::Path;

pub use shared::error::VideoError;
pub use shared::image::Image;
pub use shared::media_time::MediaTime;
pub use shared::native_format::NativeFormat;
pub use shared::pixel::{Luma8, Pixel, PremultipliedRgba8, Rgba8};
pub use video::domain::frame_sink::FrameSink;
pub use video::domain::frame_source::{FrameSource, Frames};
pub use video::infrastructure::ffmpeg_asset::FfmpegAsset;
pub use video::infrastructure::ffmpeg_output::{EncoderSettings, FfmpegOutput, VideoCodec};

/// Opens the single video track of the file at `path`.
pub fn open_video<P: Pixel>(path: impl AsRef<Path>) -> Result<FrameSource<P>, VideoError> {
    FrameSource::from_asset(FfmpegAsset::new(path))
}

/// A sink that writes a new video file at `path` once the first frame
/// arrives.
pub fn create_video<P: Pixel>(
    path: impl AsRef<Path>,
    settings: EncoderSettings,
) -> FrameSink<P, FfmpegOutput> {
    FrameSink::new(FfmpegOutput::new(path, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_open_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        let settings = EncoderSettings {
            codec: VideoCodec::Ffv1,
            ..EncoderSettings::default()
        };

        let frames: Vec<_> = (0..3u8).map(|i| Image::new(6, 4, Luma8(i * 70))).collect();
        let mut sink = create_video::<Luma8>(&path, settings);
        assert_eq!(sink.target().settings().codec, VideoCodec::Ffv1);
        for (i, frame) in frames.iter().enumerate() {
            sink.write_at_seconds(frame, i as f64 / 10.0).unwrap();
        }
        sink.finish_blocking().unwrap();

        let source = open_video::<Luma8>(&path).unwrap();
        assert_eq!(source.size(), (6, 4));
        assert_eq!(source.frames().unwrap().collect::<Vec<_>>(), frames);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let err = open_video::<Rgba8>("/nonexistent/clip.mp4").unwrap_err();
        assert!(err.platform_code().is_some());
    }
}
