use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::shared::error::VideoError;
use crate::shared::image::Image;
use crate::shared::pixel::{Luma8, Pixel, PremultipliedRgba8, Rgba8};

/// Pixel types that can be exported through the `image` crate.
pub trait SaveablePixel: Pixel {
    fn to_dynamic(image: &Image<Self>) -> DynamicImage;
}

impl SaveablePixel for Luma8 {
    fn to_dynamic(image: &Image<Self>) -> DynamicImage {
        DynamicImage::ImageLuma8(image.into())
    }
}

impl SaveablePixel for Rgba8 {
    fn to_dynamic(image: &Image<Self>) -> DynamicImage {
        DynamicImage::ImageRgba8(image.into())
    }
}

impl SaveablePixel for PremultipliedRgba8 {
    fn to_dynamic(image: &Image<Self>) -> DynamicImage {
        let straight = Image::from_pixels(
            image.width(),
            image.height(),
            image.pixels().iter().map(|p| p.to_straight()).collect(),
        );
        DynamicImage::ImageRgba8((&straight).into())
    }
}

/// Writes single frames to image files using the `image` crate. The file
/// format follows the path's extension.
///
/// Supports optional resizing for thumbnails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileWriter {
    size: Option<(u32, u32)>,
}

impl ImageFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes every written frame to `width` x `height`.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
        }
    }

    pub fn write<P: SaveablePixel>(&self, path: &Path, image: &Image<P>) -> Result<(), VideoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut output = P::to_dynamic(image);
        if let Some((width, height)) = self.size {
            output = output.resize_exact(width, height, FilterType::Triangle);
        }

        output.save(path)?;
        log::debug!("Wrote {}x{} frame to {}", output.width(), output.height(), path.display());
        Ok(())
    }
}
