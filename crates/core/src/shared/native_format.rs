use std::fmt;

/// In-memory pixel layouts requested from, and handed to, the platform
/// decoder and encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFormat {
    /// 32-bit blue, green, red, alpha.
    Bgra32,
    /// Single 8-bit luma plane.
    Gray8,
}

impl NativeFormat {
    /// Four-character platform code.
    pub const fn code(self) -> u32 {
        match self {
            Self::Bgra32 => u32::from_be_bytes(*b"BGRA"),
            Self::Gray8 => u32::from_be_bytes(*b"L008"),
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra32 => 4,
            Self::Gray8 => 1,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        [Self::Bgra32, Self::Gray8]
            .into_iter()
            .find(|format| format.code() == code)
    }

    pub(crate) fn to_ffmpeg(self) -> ffmpeg_next::format::Pixel {
        match self {
            Self::Bgra32 => ffmpeg_next::format::Pixel::BGRA,
            Self::Gray8 => ffmpeg_next::format::Pixel::GRAY8,
        }
    }
}

impl fmt::Display for NativeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code().to_be_bytes();
        write!(f, "{}", String::from_utf8_lossy(&code))
    }
}
