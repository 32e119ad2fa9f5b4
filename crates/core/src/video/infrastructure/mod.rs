pub mod ffmpeg_asset;
pub mod ffmpeg_output;
pub mod image_file_writer;
pub mod memory_asset;
pub mod memory_output;
