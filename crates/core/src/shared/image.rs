use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::pixel::{Luma8, Pixel, Rgba8};

/// A fixed-size grid of pixels, tightly packed in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<P> {
    pixels: Vec<P>,
    width: u32,
    height: u32,
}

impl<P: Pixel> Image<P> {
    /// Creates an image filled with `pixel`.
    pub fn new(width: u32, height: u32, pixel: P) -> Self {
        Self {
            pixels: vec![pixel; pixel_count(width, height)],
            width,
            height,
        }
    }

    /// Creates an image filled with the format's opaque zero.
    pub fn opaque_zero(width: u32, height: u32) -> Self {
        Self::new(width, height, P::OPAQUE_ZERO)
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<P>) -> Self {
        assert_eq!(
            pixels.len(),
            pixel_count(width, height),
            "pixel count must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Builds an image from tightly packed bytes in public channel order.
    ///
    /// Returns `None` if the length does not match the geometry.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != pixel_count(width, height) * std::mem::size_of::<P>() {
            return None;
        }
        let pixels = bytes
            .chunks_exact(std::mem::size_of::<P>())
            .map(bytemuck::pod_read_unaligned)
            .collect();
        Some(Self {
            pixels,
            width,
            height,
        })
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

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixel(&self, x: u32, y: u32) -> P {
        self.pixels[self.offset(x, y)]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut P {
        let offset = self.offset(x, y);
        &mut self.pixels[offset]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: P) {
        *self.pixel_mut(x, y) = pixel;
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [P] {
        &mut self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[P]> + '_ {
        self.pixels.chunks_exact(self.width.max(1) as usize)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), self.as_bytes())
            .expect("Image data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, self.as_bytes_mut())
            .expect("Image data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, P::CHANNELS)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{} image",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

impl From<image::GrayImage> for Image<Luma8> {
    fn from(img: image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw().into_iter().map(Luma8).collect();
        Self::from_pixels(width, height, pixels)
    }
}

impl From<image::RgbaImage> for Image<Rgba8> {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| Rgba8::new(p[0], p[1], p[2], p[3]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }
}

impl From<&Image<Luma8>> for image::GrayImage {
    fn from(img: &Image<Luma8>) -> Self {
        image::GrayImage::from_fn(img.width, img.height, |x, y| image::Luma([img.pixel(x, y).0]))
    }
}

impl From<&Image<Rgba8>> for image::RgbaImage {
    fn from(img: &Image<Rgba8>) -> Self {
        image::RgbaImage::from_fn(img.width, img.height, |x, y| {
            let p = img.pixel(x, y);
            image::Rgba([p.r, p.g, p.b, p.a])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::pixel::PremultipliedRgba8;

    #[test]
    fn test_construction_and_accessors() {
        let img = Image::new(3, 2, Luma8(9));
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 2);
        assert_eq!(img.size(), (3, 2));
        assert_eq!(img.pixels().len(), 6);
        assert!(img.pixels().iter().all(|&p| p == Luma8(9)));
    }

    #[test]
    fn test_opaque_zero_fill() {
        let img = Image::<Rgba8>::opaque_zero(2, 2);
        assert!(img.pixels().iter().all(|&p| p == Rgba8::new(0, 0, 0, 255)));
    }

    #[test]
    fn test_set_and_get_pixel() {
        let mut img = Image::<Rgba8>::opaque_zero(4, 3);
        img.set_pixel(3, 2, Rgba8::new(1, 2, 3, 4));
        assert_eq!(img.pixel(3, 2), Rgba8::new(1, 2, 3, 4));
        assert_eq!(img.pixels()[11], Rgba8::new(1, 2, 3, 4));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_pixel_out_of_bounds_panics() {
        let img = Image::<Luma8>::opaque_zero(2, 2);
        img.pixel(2, 0);
    }

    #[test]
    #[should_panic(expected = "pixel count must equal width * height")]
    fn test_mismatched_pixel_count_panics() {
        Image::from_pixels(2, 2, vec![Luma8(0); 3]);
    }

    #[test]
    fn test_bulk_bytes_are_public_channel_order() {
        let img = Image::new(1, 1, Rgba8::new(10, 20, 30, 40));
        assert_eq!(img.as_bytes(), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_from_bytes() {
        let img = Image::<PremultipliedRgba8>::from_bytes(2, 1, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(img.pixel(1, 0), PremultipliedRgba8::new(5, 6, 7, 8));
        assert!(Image::<Rgba8>::from_bytes(2, 1, &[0; 7]).is_none());
    }

    #[test]
    fn test_rows() {
        let img = Image::from_pixels(2, 2, vec![Luma8(1), Luma8(2), Luma8(3), Luma8(4)]);
        let rows: Vec<_> = img.rows().collect();
        assert_eq!(rows, vec![&[Luma8(1), Luma8(2)][..], &[Luma8(3), Luma8(4)][..]]);
    }

    #[test]
    fn test_empty_image() {
        let img = Image::<Rgba8>::opaque_zero(0, 0);
        assert!(img.is_empty());
        assert_eq!(img.rows().count(), 0);
        assert!(img.as_bytes().is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let img = Image::new(2, 2, Luma8(100));
        let mut cloned = img.clone();
        cloned.set_pixel(0, 0, Luma8(0));
        assert_eq!(img.pixel(0, 0), Luma8(100));
        assert_eq!(cloned.pixel(0, 0), Luma8(0));
    }

    #[test]
    fn test_as_ndarray_shape() {
        let img = Image::<Rgba8>::opaque_zero(4, 2);
        assert_eq!(img.as_ndarray().shape(), &[2, 4, 4]);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut img = Image::<Rgba8>::opaque_zero(2, 2);
        img.as_ndarray_mut()[[1, 0, 2]] = 128;
        assert_eq!(img.pixel(0, 1), Rgba8::new(0, 0, 128, 255));
    }

    #[test]
    fn test_image_crate_roundtrip() {
        let mut buffer = image::RgbaImage::new(3, 2);
        buffer.put_pixel(2, 1, image::Rgba([9, 8, 7, 6]));
        let img = Image::<Rgba8>::from(buffer.clone());
        assert_eq!(img.pixel(2, 1), Rgba8::new(9, 8, 7, 6));
        assert_eq!(image::RgbaImage::from(&img), buffer);
    }

    #[test]
    fn test_gray_image_conversion() {
        let buffer = image::GrayImage::from_pixel(2, 2, image::Luma([42]));
        let img = Image::<Luma8>::from(buffer);
        assert!(img.pixels().iter().all(|&p| p == Luma8(42)));
    }
}
