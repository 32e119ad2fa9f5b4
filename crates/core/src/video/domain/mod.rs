pub mod buffer_copy;
pub mod encode_target;
pub mod frame_sink;
pub mod frame_source;
pub mod video_asset;
