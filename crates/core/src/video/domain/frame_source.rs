use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::shared::error::VideoError;
use crate::shared::image::Image;
use crate::shared::pixel::Pixel;
use crate::video::domain::buffer_copy::image_from_native;
use crate::video::domain::video_asset::VideoAsset;

/// Produces successive frames of one traversal; `None` ends it.
pub type PullFn<P> = Box<dyn FnMut() -> Option<Image<P>> + Send>;

type Factory<P> = Arc<dyn Fn() -> Result<PullFn<P>, VideoError> + Send + Sync>;

/// A video as a repeatable, lazily decoded sequence of images.
///
/// The source itself holds no decoder state: every call to
/// [`frames`](Self::frames) creates a fresh pull function that reads the
/// video from its first frame.
pub struct FrameSource<P> {
    width: u32,
    height: u32,
    factory: Factory<P>,
}

impl<P: Pixel> FrameSource<P> {
    /// Creates a source from an infallible pull-function factory.
    ///
    /// Panics unless both dimensions are positive or both are zero.
    pub fn new<F, G>(width: u32, height: u32, make_pull: F) -> Self
    where
        F: Fn() -> G + Send + Sync + 'static,
        G: FnMut() -> Option<Image<P>> + Send + 'static,
    {
        Self::from_factory(width, height, move || Ok(Box::new(make_pull()) as PullFn<P>))
    }

    /// Creates a source whose traversals may fail to start, e.g. because the
    /// decoder cannot be opened.
    pub fn from_factory<F>(width: u32, height: u32, factory: F) -> Self
    where
        F: Fn() -> Result<PullFn<P>, VideoError> + Send + Sync + 'static,
    {
        assert!(
            (width > 0 && height > 0) || (width == 0 && height == 0),
            "`width` and `height` must both be positive or both be 0: ({width}, {height})"
        );
        Self {
            width,
            height,
            factory: Arc::new(factory),
        }
    }

    /// A track-less source; its traversals yield nothing.
    pub fn empty() -> Self {
        Self::new(0, 0, || || None)
    }

    /// Reads the single video track of `asset`.
    ///
    /// The declared size comes from the first decoded frame; an asset whose
    /// track has no frames becomes an empty source. Each traversal opens its
    /// own decode session.
    pub fn from_asset<A: VideoAsset + 'static>(asset: A) -> Result<Self, VideoError> {
        match asset.video_track_count()? {
            0 => return Err(VideoError::NoVideoTrack),
            1 => {}
            n => return Err(VideoError::MultipleVideoTracks(n)),
        }

        let mut probe = asset.open_decode_session(P::NATIVE_FORMAT)?;
        let size = probe
            .pull_next_buffer()
            .map(|buffer| (buffer.width(), buffer.height()));
        drop(probe);

        let (width, height) = match size {
            Some((width, height)) if width > 0 && height > 0 => (width, height),
            Some((width, height)) => {
                log::warn!("Video track reports a {width}x{height} frame; treating as empty");
                return Ok(Self::empty());
            }
            None => {
                log::debug!("Video track has no frames");
                return Ok(Self::empty());
            }
        };
        log::debug!("Opened {width}x{height} video track as {}", P::NATIVE_FORMAT);

        let asset = Arc::new(asset);
        Ok(Self::from_factory(width, height, move || {
            let mut session = asset.open_decode_session(P::NATIVE_FORMAT)?;
            let pull: PullFn<P> = Box::new(move || {
                session
                    .pull_next_buffer()
                    .map(|buffer| image_from_native(&buffer))
            });
            Ok(pull)
        }))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Starts a new traversal from the first frame.
    pub fn frames(&self) -> Result<Frames<P>, VideoError> {
        let pull = (self.factory)()?;
        Ok(Frames {
            width: self.width,
            height: self.height,
            pull: Some(pull),
        })
    }
}

impl<P> Clone for FrameSource<P> {
    fn clone(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<P> fmt::Debug for FrameSource<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSource")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Forward-only cursor over one traversal of a [`FrameSource`].
///
/// Panics if the pull function yields a frame whose size differs from the
/// source's declared size. Once exhausted it stays exhausted, and the pull
/// function (with any decoder it owns) is dropped.
pub struct Frames<P> {
    width: u32,
    height: u32,
    pull: Option<PullFn<P>>,
}

impl<P> Frames<P> {
    pub fn is_exhausted(&self) -> bool {
        self.pull.is_none()
    }
}

impl<P: Pixel> Iterator for Frames<P> {
    type Item = Image<P>;

    fn next(&mut self) -> Option<Image<P>> {
        let pull = self.pull.as_mut()?;
        let Some(frame) = pull() else {
            self.pull = None;
            return None;
        };
        assert!(
            frame.width() == self.width && frame.height() == self.height,
            "Illegal frame size: frame.size = ({}, {}), video.size = ({}, {})",
            frame.width(),
            frame.height(),
            self.width,
            self.height
        );
        Some(frame)
    }
}

impl<P: Pixel> FusedIterator for Frames<P> {}

impl<P> fmt::Debug for Frames<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frames")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}
