/// Timescale of times built from seconds or durations.
pub const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Encoder time base denominator (ticks per second). MPEG-4 part 2 caps
/// this at 65535.
pub const DEFAULT_TIME_BASE: i32 = 600;

/// Frame rate advertised to encoders that need one up front.
pub const DEFAULT_FRAME_RATE: i32 = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "tiff", "tif"];
