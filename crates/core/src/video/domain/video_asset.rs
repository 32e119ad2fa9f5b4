use crate::shared::error::VideoError;
use crate::shared::native_format::NativeFormat;

/// A decoded frame borrowed from the platform decoder.
///
/// The borrow is the lock: the platform may reuse or release the memory as
/// soon as the buffer is dropped. Rows may be padded, so `bytes_per_row`
/// can exceed `width * bytes_per_pixel`.
#[derive(Debug)]
pub struct RawBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: NativeFormat,
}

impl<'a> RawBuffer<'a> {
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        bytes_per_row: usize,
        format: NativeFormat,
    ) -> Self {
        check_layout(data.len(), width, height, bytes_per_row, format);
        Self {
            data,
            width,
            height,
            bytes_per_row,
            format,
        }
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn format(&self) -> NativeFormat {
        self.format
    }
}

/// Panics unless `len` bytes can hold `height` rows of `bytes_per_row`
/// (the last row may omit its padding).
pub(crate) fn check_layout(
    len: usize,
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: NativeFormat,
) {
    let row_bytes = width as usize * format.bytes_per_pixel();
    assert!(
        bytes_per_row >= row_bytes,
        "row stride {bytes_per_row} is smaller than {row_bytes} bytes of pixels"
    );
    let required = match height as usize {
        0 => 0,
        rows => (rows - 1) * bytes_per_row + row_bytes,
    };
    assert!(
        len >= required,
        "buffer of {len} bytes cannot hold {width}x{height} {format} pixels"
    );
}

/// Per-traversal decoder state. Owns every native resource needed to read
/// one video track from the start.
pub trait DecodeSession: Send {
    /// Decodes the next frame. `None` means end of stream; sessions never
    /// produce frames after returning `None`.
    fn pull_next_buffer(&mut self) -> Option<RawBuffer<'_>>;
}

/// A readable video container.
///
/// Implementations describe where the video lives; opening a decode
/// session is where device I/O and decoder start-up happen.
pub trait VideoAsset: Send + Sync {
    fn video_track_count(&self) -> Result<usize, VideoError>;

    /// Starts decoding the single video track, converting frames to `format`.
    fn open_decode_session(
        &self,
        format: NativeFormat,
    ) -> Result<Box<dyn DecodeSession>, VideoError>;
}
