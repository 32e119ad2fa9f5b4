use crate::shared::error::VideoError;
use crate::shared::media_time::MediaTime;
use crate::shared::native_format::NativeFormat;
use crate::video::domain::video_asset::check_layout;

/// Invoked once output finalization has completed or failed.
pub type CompletionFn = Box<dyn FnOnce(Result<(), VideoError>) + Send>;

/// The encoder's writable pixel buffer, borrowed for one frame.
#[derive(Debug)]
pub struct RawBufferMut<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: NativeFormat,
}

impl<'a> RawBufferMut<'a> {
    pub fn new(
        data: &'a mut [u8],
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
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut *self.data
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

/// One output video track bound to a fixed geometry and native format.
pub trait EncodeSession: Send {
    /// Starts the output session; called once, before the first append.
    fn start(&mut self, at: MediaTime) -> Result<(), VideoError>;

    /// The buffer the next frame is written into before `append_buffer`.
    fn writable_buffer(&mut self) -> Result<RawBufferMut<'_>, VideoError>;

    /// Hands the current contents of the writable buffer to the encoder.
    fn append_buffer(&mut self, at: MediaTime) -> Result<(), VideoError>;

    /// Marks the input finished, ends the session at `end` and finalizes
    /// the output. May complete on another thread; `on_complete` is called
    /// exactly once.
    fn finalize(self: Box<Self>, end: MediaTime, on_complete: CompletionFn);
}

/// A writable video destination.
pub trait EncodeTarget: Send {
    fn open_encode_session(
        &self,
        width: u32,
        height: u32,
        format: NativeFormat,
    ) -> Result<Box<dyn EncodeSession>, VideoError>;
}
