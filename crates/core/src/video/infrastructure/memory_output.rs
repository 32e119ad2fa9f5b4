use std::sync::{Arc, Mutex, MutexGuard};

use crate::shared::error::VideoError;
use crate::shared::media_time::MediaTime;
use crate::shared::native_format::NativeFormat;
use crate::video::domain::encode_target::{
    CompletionFn, EncodeSession, EncodeTarget, RawBufferMut,
};
use crate::video::infrastructure::memory_asset::{MemoryAsset, NativeFrame};

/// Everything a [`MemoryOutput`] received from its latest encode session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    pub size: Option<(u32, u32)>,
    pub format: Option<NativeFormat>,
    pub start: Option<MediaTime>,
    pub frames: Vec<(MediaTime, NativeFrame)>,
    pub end: Option<MediaTime>,
    pub finalized: bool,
}

/// An encode target that keeps appended native frames in memory.
///
/// Clones share the same recording, so a clone kept by the caller observes
/// what a [`FrameSink`] wrote.
///
/// [`FrameSink`]: crate::video::domain::frame_sink::FrameSink
#[derive(Clone, Debug, Default)]
pub struct MemoryOutput {
    recording: Arc<Mutex<Recording>>,
    row_padding: usize,
    fail_with: Option<i32>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pads every row of the writable buffer with `bytes` extra bytes.
    pub fn with_row_padding(mut self, bytes: usize) -> Self {
        self.row_padding = bytes;
        self
    }

    /// Makes every session fail to allocate its pixel buffer with `code`.
    pub fn failing_with(mut self, code: i32) -> Self {
        self.fail_with = Some(code);
        self
    }

    pub fn recording(&self) -> Recording {
        lock(&self.recording).clone()
    }

    /// The recorded frames as a single-track asset.
    pub fn to_asset(&self) -> MemoryAsset {
        let frames = lock(&self.recording)
            .frames
            .iter()
            .map(|(_, frame)| frame.clone())
            .collect();
        MemoryAsset::new().with_track(frames)
    }
}

impl EncodeTarget for MemoryOutput {
    fn open_encode_session(
        &self,
        width: u32,
        height: u32,
        format: NativeFormat,
    ) -> Result<Box<dyn EncodeSession>, VideoError> {
        if let Some(code) = self.fail_with {
            return Err(VideoError::PixelBufferAllocation(code));
        }
        *lock(&self.recording) = Recording {
            size: Some((width, height)),
            format: Some(format),
            ..Recording::default()
        };
        let bytes_per_row = width as usize * format.bytes_per_pixel() + self.row_padding;
        Ok(Box::new(MemorySession {
            recording: Arc::clone(&self.recording),
            buffer: vec![0; bytes_per_row * height as usize],
            width,
            height,
            bytes_per_row,
            format,
        }))
    }
}

struct MemorySession {
    recording: Arc<Mutex<Recording>>,
    buffer: Vec<u8>,
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: NativeFormat,
}

impl EncodeSession for MemorySession {
    fn start(&mut self, at: MediaTime) -> Result<(), VideoError> {
        lock(&self.recording).start = Some(at);
        Ok(())
    }

    fn writable_buffer(&mut self) -> Result<RawBufferMut<'_>, VideoError> {
        Ok(RawBufferMut::new(
            &mut self.buffer,
            self.width,
            self.height,
            self.bytes_per_row,
            self.format,
        ))
    }

    fn append_buffer(&mut self, at: MediaTime) -> Result<(), VideoError> {
        let frame = NativeFrame::new(
            self.buffer.clone(),
            self.width,
            self.height,
            self.bytes_per_row,
            self.format,
        );
        lock(&self.recording).frames.push((at, frame));
        Ok(())
    }

    fn finalize(self: Box<Self>, end: MediaTime, on_complete: CompletionFn) {
        {
            let mut recording = lock(&self.recording);
            recording.end = Some(end);
            recording.finalized = true;
        }
        on_complete(Ok(()));
    }
}

// A panic while holding the lock leaves the recording consistent, so a
// poisoned mutex is still readable.
fn lock(recording: &Mutex<Recording>) -> MutexGuard<'_, Recording> {
    recording
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
