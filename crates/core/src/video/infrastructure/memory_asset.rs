use std::sync::Arc;

use crate::shared::error::VideoError;
use crate::shared::image::Image;
use crate::shared::native_format::NativeFormat;
use crate::shared::pixel::Pixel;
use crate::video::domain::buffer_copy::copy_to_native;
use crate::video::domain::encode_target::RawBufferMut;
use crate::video::domain::video_asset::{check_layout, DecodeSession, RawBuffer, VideoAsset};

/// An owned frame in a native buffer layout.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: NativeFormat,
}

impl NativeFrame {
    pub fn new(
        data: Vec<u8>,
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

    /// Converts `image` into its pixel type's native layout, padding each
    /// row with `row_padding` zero bytes.
    pub fn from_image<P: Pixel>(image: &Image<P>, row_padding: usize) -> Self {
        let format = P::NATIVE_FORMAT;
        let bytes_per_row = image.width() as usize * format.bytes_per_pixel() + row_padding;
        let mut data = vec![0; bytes_per_row * image.height() as usize];
        copy_to_native(
            image,
            &mut RawBufferMut::new(&mut data, image.width(), image.height(), bytes_per_row, format),
        );
        Self::new(data, image.width(), image.height(), bytes_per_row, format)
    }

    pub fn as_raw(&self) -> RawBuffer<'_> {
        RawBuffer::new(
            &self.data,
            self.width,
            self.height,
            self.bytes_per_row,
            self.format,
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
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

/// An in-process video container holding already decoded native frames.
///
/// Decoding the first track replays its frames in order. Used to feed
/// frames produced elsewhere in the process through a [`FrameSource`], and
/// to read back what a [`MemoryOutput`] recorded.
///
/// [`FrameSource`]: crate::video::domain::frame_source::FrameSource
/// [`MemoryOutput`]: crate::video::infrastructure::memory_output::MemoryOutput
#[derive(Clone, Debug, Default)]
pub struct MemoryAsset {
    tracks: Arc<Vec<Vec<NativeFrame>>>,
}

impl MemoryAsset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(self, frames: Vec<NativeFrame>) -> Self {
        let mut tracks = Vec::clone(&self.tracks);
        tracks.push(frames);
        Self {
            tracks: Arc::new(tracks),
        }
    }

    /// A single-track asset holding `images` in tightly packed native form.
    pub fn from_images<P: Pixel>(images: &[Image<P>]) -> Self {
        let frames = images
            .iter()
            .map(|image| NativeFrame::from_image(image, 0))
            .collect();
        Self::new().with_track(frames)
    }
}

impl VideoAsset for MemoryAsset {
    fn video_track_count(&self) -> Result<usize, VideoError> {
        Ok(self.tracks.len())
    }

    fn open_decode_session(
        &self,
        format: NativeFormat,
    ) -> Result<Box<dyn DecodeSession>, VideoError> {
        let track = self.tracks.first().ok_or(VideoError::NoVideoTrack)?;
        if track.iter().any(|frame| frame.format != format) {
            return Err(VideoError::UnsupportedFormat(format));
        }
        Ok(Box::new(MemoryDecodeSession {
            tracks: Arc::clone(&self.tracks),
            next: 0,
        }))
    }
}

struct MemoryDecodeSession {
    tracks: Arc<Vec<Vec<NativeFrame>>>,
    next: usize,
}

impl DecodeSession for MemoryDecodeSession {
    fn pull_next_buffer(&mut self) -> Option<RawBuffer<'_>> {
        let frame = self.tracks[0].get(self.next)?;
        self.next += 1;
        Some(frame.as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::pixel::{Luma8, Rgba8};
    use crate::video::domain::frame_source::FrameSource;

    fn rgba_frames(count: u8, width: u32, height: u32) -> Vec<Image<Rgba8>> {
        (0..count)
            .map(|i| Image::new(width, height, Rgba8::new(i, 10, 200, 255)))
            .collect()
    }

    #[test]
    fn test_native_frame_from_image_is_bgra_and_padded() {
        let image = Image::new(2, 1, Rgba8::new(1, 2, 3, 4));
        let frame = NativeFrame::from_image(&image, 3);
        assert_eq!(frame.bytes_per_row(), 11);
        assert_eq!(frame.data(), &[3, 2, 1, 4, 3, 2, 1, 4, 0, 0, 0]);
    }

    #[test]
    fn test_four_by_three_scenario() {
        let asset = MemoryAsset::from_images(&rgba_frames(3, 4, 3));
        let source = FrameSource::<Rgba8>::from_asset(asset).unwrap();
        assert_eq!(source.size(), (4, 3));

        let frames: Vec<_> = source.frames().unwrap().collect();
        assert_eq!(frames, rgba_frames(3, 4, 3));
    }

    #[test]
    fn test_padded_track_decodes_exactly() {
        let images = rgba_frames(2, 5, 2);
        let track = images
            .iter()
            .map(|image| NativeFrame::from_image(image, 12))
            .collect();
        let source = FrameSource::<Rgba8>::from_asset(MemoryAsset::new().with_track(track)).unwrap();
        assert_eq!(source.frames().unwrap().collect::<Vec<_>>(), images);
    }

    #[test]
    fn test_two_tracks_rejected() {
        let asset = MemoryAsset::from_images(&rgba_frames(1, 2, 2)).with_track(Vec::new());
        let err = FrameSource::<Rgba8>::from_asset(asset).unwrap_err();
        assert_eq!(err.to_string(), "multiple video tracks: 2");
    }

    #[test]
    fn test_no_tracks_rejected() {
        let err = FrameSource::<Luma8>::from_asset(MemoryAsset::new()).unwrap_err();
        assert!(matches!(err, VideoError::NoVideoTrack));
    }

    #[test]
    fn test_empty_track_is_empty_source() {
        let source = FrameSource::<Luma8>::from_asset(MemoryAsset::new().with_track(Vec::new()))
            .unwrap();
        assert_eq!(source.size(), (0, 0));
        assert_eq!(source.frames().unwrap().count(), 0);
    }

    #[test]
    fn test_wrong_pixel_type_is_unsupported() {
        let asset = MemoryAsset::from_images(&rgba_frames(1, 2, 2));
        let err = FrameSource::<Luma8>::from_asset(asset).unwrap_err();
        assert!(matches!(err, VideoError::UnsupportedFormat(NativeFormat::Gray8)));
    }
}
