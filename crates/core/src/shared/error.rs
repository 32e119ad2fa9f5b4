use thiserror::Error;

use crate::shared::native_format::NativeFormat;

/// Recoverable failures reported by sources, sinks and platform backends.
///
/// Contract violations by the caller (mismatched frame sizes, writing after
/// a sink finished, zero-sized geometry) are not represented here; they
/// panic.
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("no video track found")]
    NoVideoTrack,
    #[error("multiple video tracks: {0}")]
    MultipleVideoTracks(usize),
    #[error("failed to create pixel buffer (code {0})")]
    PixelBufferAllocation(i32),
    #[error("failed to open decode session (code {code}): {message}")]
    DecodeSession { code: i32, message: String },
    #[error("failed to open encode session (code {code}): {message}")]
    EncodeSession { code: i32, message: String },
    #[error("encoder rejected frame (code {code}): {message}")]
    Encode { code: i32, message: String },
    #[error("failed to finalize output (code {code}): {message}")]
    Finalize { code: i32, message: String },
    #[error("unsupported native format: {0}")]
    UnsupportedFormat(NativeFormat),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl VideoError {
    pub(crate) fn decode_session(err: ffmpeg_next::Error) -> Self {
        Self::DecodeSession {
            code: i32::from(err),
            message: err.to_string(),
        }
    }

    pub(crate) fn encode_session(err: ffmpeg_next::Error) -> Self {
        Self::EncodeSession {
            code: i32::from(err),
            message: err.to_string(),
        }
    }

    pub(crate) fn encode(err: ffmpeg_next::Error) -> Self {
        Self::Encode {
            code: i32::from(err),
            message: err.to_string(),
        }
    }

    pub(crate) fn finalize(err: ffmpeg_next::Error) -> Self {
        Self::Finalize {
            code: i32::from(err),
            message: err.to_string(),
        }
    }

    /// Underlying platform result code, when the failure carries one.
    pub fn platform_code(&self) -> Option<i32> {
        match self {
            Self::PixelBufferAllocation(code) => Some(*code),
            Self::DecodeSession { code, .. }
            | Self::EncodeSession { code, .. }
            | Self::Encode { code, .. }
            | Self::Finalize { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_tracks_message() {
        let err = VideoError::MultipleVideoTracks(2);
        assert_eq!(err.to_string(), "multiple video tracks: 2");
    }

    #[test]
    fn test_no_track_message() {
        assert_eq!(VideoError::NoVideoTrack.to_string(), "no video track found");
    }

    #[test]
    fn test_platform_code_is_carried() {
        assert_eq!(VideoError::PixelBufferAllocation(-6661).platform_code(), Some(-6661));
        let err = VideoError::EncodeSession {
            code: -22,
            message: "Invalid argument".to_string(),
        };
        assert_eq!(err.platform_code(), Some(-22));
        assert_eq!(VideoError::NoVideoTrack.platform_code(), None);
    }

    #[test]
    fn test_ffmpeg_error_maps_to_code() {
        let err = VideoError::encode_session(ffmpeg_next::Error::InvalidData);
        assert_eq!(err.platform_code(), Some(i32::from(ffmpeg_next::Error::InvalidData)));
    }
}
