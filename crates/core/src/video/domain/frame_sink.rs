use std::marker::PhantomData;
use std::time::Duration;

use crate::shared::error::VideoError;
use crate::shared::image::Image;
use crate::shared::media_time::MediaTime;
use crate::shared::pixel::Pixel;
use crate::video::domain::buffer_copy::copy_to_native;
use crate::video::domain::encode_target::{EncodeSession, EncodeTarget};

enum SinkState {
    Unopened,
    Open(OpenSink),
    Finished,
}

struct OpenSink {
    session: Box<dyn EncodeSession>,
    width: u32,
    height: u32,
    start_time: MediaTime,
    last_time: Option<MediaTime>,
}

/// Encodes a stream of equally sized images into one video track.
///
/// A sink created with [`new`](Self::new) opens its encode session on the
/// first write, using that image's size; [`with_size`](Self::with_size)
/// opens it immediately. Writing an image of a different size, or writing
/// after [`finish`](Self::finish), panics.
pub struct FrameSink<P, T> {
    target: T,
    state: SinkState,
    _pixel: PhantomData<fn(&Image<P>)>,
}

impl<P: Pixel, T: EncodeTarget> FrameSink<P, T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            state: SinkState::Unopened,
            _pixel: PhantomData,
        }
    }

    /// Opens the encode session up front and starts it at time zero.
    pub fn with_size(target: T, width: u32, height: u32) -> Result<Self, VideoError> {
        assert!(width > 0, "`width` must be greater than 0: {width}");
        assert!(height > 0, "`height` must be greater than 0: {height}");
        let mut sink = Self::new(target);
        sink.open(width, height, MediaTime::ZERO)?;
        Ok(sink)
    }

    /// Appends `image` at presentation time `at`.
    pub fn write(&mut self, image: &Image<P>, at: MediaTime) -> Result<(), VideoError> {
        if matches!(self.state, SinkState::Unopened) {
            assert!(
                image.width() > 0,
                "`width` must be greater than 0: {}",
                image.width()
            );
            assert!(
                image.height() > 0,
                "`height` must be greater than 0: {}",
                image.height()
            );
            self.open(image.width(), image.height(), at)?;
        }

        let open = match &mut self.state {
            SinkState::Open(open) => open,
            SinkState::Finished => panic!("cannot write to a FrameSink after finish()"),
            SinkState::Unopened => unreachable!("sink opened above"),
        };
        assert!(
            image.width() == open.width && image.height() == open.height,
            "The size of the frame ({}, {}) must be equal to ({}, {}).",
            image.width(),
            image.height(),
            open.width,
            open.height
        );

        let mut buffer = open.session.writable_buffer()?;
        copy_to_native(image, &mut buffer);
        open.session.append_buffer(at)?;
        open.last_time = Some(at);
        Ok(())
    }

    pub fn write_at_seconds(&mut self, image: &Image<P>, seconds: f64) -> Result<(), VideoError> {
        self.write(image, MediaTime::from_seconds(seconds))
    }

    /// Appends `image` `interval` after the previous frame, or at time zero
    /// if nothing has been written yet.
    pub fn write_after(&mut self, image: &Image<P>, interval: Duration) -> Result<(), VideoError> {
        let at = match self.last_time() {
            Some(last) => last + interval,
            None => MediaTime::ZERO,
        };
        self.write(image, at)
    }

    /// Ends the track at the last written time and finalizes the output.
    ///
    /// Finalization may complete on another thread; the output is only
    /// complete once `on_complete` has run. Does nothing, and never calls
    /// `on_complete`, if the sink was never opened or is already finished.
    pub fn finish<F>(&mut self, on_complete: F)
    where
        F: FnOnce(Result<(), VideoError>) + Send + 'static,
    {
        match std::mem::replace(&mut self.state, SinkState::Finished) {
            SinkState::Open(open) => {
                let end = open.last_time.unwrap_or(open.start_time);
                log::info!(
                    "Finishing {}x{} track at {:.3}s",
                    open.width,
                    open.height,
                    end.seconds()
                );
                open.session.finalize(end, Box::new(on_complete));
            }
            SinkState::Unopened => {
                log::debug!("finish() on a sink that was never opened");
                self.state = SinkState::Unopened;
            }
            SinkState::Finished => {}
        }
    }

    /// Like [`finish`](Self::finish), but waits for finalization and returns
    /// its result. Returns `Ok(())` at once when there is nothing to finish.
    pub fn finish_blocking(&mut self) -> Result<(), VideoError> {
        if !self.is_open() {
            return Ok(());
        }
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.finish(move |result| {
            let _ = tx.send(result);
        });
        rx.recv().map_err(|_| VideoError::Finalize {
            code: 0,
            message: "encoder dropped the completion callback".to_string(),
        })?
    }

    /// Track size, once the encode session is open.
    pub fn size(&self) -> Option<(u32, u32)> {
        match &self.state {
            SinkState::Open(open) => Some((open.width, open.height)),
            _ => None,
        }
    }

    pub fn last_time(&self) -> Option<MediaTime> {
        match &self.state {
            SinkState::Open(open) => open.last_time,
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open(_))
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SinkState::Finished)
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn open(&mut self, width: u32, height: u32, at: MediaTime) -> Result<(), VideoError> {
        let mut session = self
            .target
            .open_encode_session(width, height, P::NATIVE_FORMAT)?;
        session.start(at)?;
        log::debug!(
            "Opened {width}x{height} {} encode session at {:.3}s",
            P::NATIVE_FORMAT,
            at.seconds()
        );
        self.state = SinkState::Open(OpenSink {
            session,
            width,
            height,
            start_time: at,
            last_time: None,
        });
        Ok(())
    }
}

impl<P, T> Drop for FrameSink<P, T> {
    fn drop(&mut self) {
        if let SinkState::Open(open) = &self.state {
            log::warn!(
                "FrameSink for a {}x{} track dropped without finish(); output is incomplete",
                open.width,
                open.height
            );
        }
    }
}
