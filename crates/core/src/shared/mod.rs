pub mod constants;
pub mod error;
pub mod image;
pub mod media_time;
pub mod native_format;
pub mod pixel;
