use std::fmt::Debug;

use bytemuck::{Pod, Zeroable};

use crate::shared::native_format::NativeFormat;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Luma8 {}
    impl Sealed for super::Rgba8 {}
    impl Sealed for super::PremultipliedRgba8 {}
}

/// Pixel representations supported by sources and sinks.
///
/// Each type names the native buffer format to request from the platform
/// and the per-pixel conversion between that native channel order and the
/// public one. `to_native` must undo `from_native`.
///
/// The set is closed: the trait is sealed.
pub trait Pixel: Pod + Debug + PartialEq + Send + Sync + sealed::Sealed {
    const NATIVE_FORMAT: NativeFormat;
    const OPAQUE_ZERO: Self;
    const CHANNELS: usize;

    /// Converts a pixel read from a native buffer into public channel order.
    fn from_native(&mut self);

    /// Converts a pixel in public channel order into native order.
    fn to_native(&mut self);
}

/// 8-bit luma.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Luma8(pub u8);

/// 8-bit straight-alpha RGBA.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// 8-bit RGBA with colour channels premultiplied by alpha.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PremultipliedRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, u8::MAX)
    }
}

impl PremultipliedRgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_straight(pixel: Rgba8) -> Self {
        let scale = |c: u8| ((u16::from(c) * u16::from(pixel.a) + 127) / 255) as u8;
        Self::new(scale(pixel.r), scale(pixel.g), scale(pixel.b), pixel.a)
    }

    pub fn to_straight(self) -> Rgba8 {
        if self.a == 0 {
            return Rgba8::new(0, 0, 0, 0);
        }
        let alpha = u16::from(self.a);
        let unscale = |c: u8| ((u16::from(c) * 255 + alpha / 2) / alpha).min(255) as u8;
        Rgba8::new(unscale(self.r), unscale(self.g), unscale(self.b), self.a)
    }
}

impl Pixel for Luma8 {
    const NATIVE_FORMAT: NativeFormat = NativeFormat::Gray8;
    const OPAQUE_ZERO: Self = Luma8(0);
    const CHANNELS: usize = 1;

    fn from_native(&mut self) {}

    fn to_native(&mut self) {}
}

impl Pixel for Rgba8 {
    const NATIVE_FORMAT: NativeFormat = NativeFormat::Bgra32;
    const OPAQUE_ZERO: Self = Rgba8::opaque(0, 0, 0);
    const CHANNELS: usize = 4;

    fn from_native(&mut self) {
        std::mem::swap(&mut self.r, &mut self.b);
    }

    fn to_native(&mut self) {
        std::mem::swap(&mut self.r, &mut self.b);
    }
}

impl Pixel for PremultipliedRgba8 {
    const NATIVE_FORMAT: NativeFormat = NativeFormat::Bgra32;
    const OPAQUE_ZERO: Self = PremultipliedRgba8::new(0, 0, 0, u8::MAX);
    const CHANNELS: usize = 4;

    fn from_native(&mut self) {
        std::mem::swap(&mut self.r, &mut self.b);
    }

    fn to_native(&mut self) {
        std::mem::swap(&mut self.r, &mut self.b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<P: Pixel>(pixel: P) -> P {
        let mut converted = pixel;
        converted.to_native();
        converted.from_native();
        converted
    }

    #[test]
    fn test_sizes_match_native_formats() {
        assert_eq!(std::mem::size_of::<Luma8>(), NativeFormat::Gray8.bytes_per_pixel());
        assert_eq!(std::mem::size_of::<Rgba8>(), NativeFormat::Bgra32.bytes_per_pixel());
        assert_eq!(
            std::mem::size_of::<PremultipliedRgba8>(),
            NativeFormat::Bgra32.bytes_per_pixel()
        );
    }

    #[test]
    fn test_rgba_from_native_reads_bgra_bytes() {
        let mut pixel: Rgba8 = bytemuck::cast([10u8, 20, 30, 40]);
        pixel.from_native();
        assert_eq!(pixel, Rgba8::new(30, 20, 10, 40));
    }

    #[test]
    fn test_rgba_to_native_writes_bgra_bytes() {
        let mut pixel = Rgba8::new(1, 2, 3, 4);
        pixel.to_native();
        assert_eq!(bytemuck::cast::<Rgba8, [u8; 4]>(pixel), [3, 2, 1, 4]);
    }

    #[test]
    fn test_luma_is_identity() {
        let mut pixel = Luma8(77);
        pixel.from_native();
        assert_eq!(pixel, Luma8(77));
        pixel.to_native();
        assert_eq!(pixel, Luma8(77));
    }

    #[test]
    fn test_conversions_are_inverse() {
        assert_eq!(roundtrip(Luma8(200)), Luma8(200));
        assert_eq!(roundtrip(Rgba8::new(1, 2, 3, 4)), Rgba8::new(1, 2, 3, 4));
        assert_eq!(
            roundtrip(PremultipliedRgba8::new(5, 6, 7, 8)),
            PremultipliedRgba8::new(5, 6, 7, 8)
        );
    }

    #[test]
    fn test_opaque_zero_values() {
        assert_eq!(Luma8::OPAQUE_ZERO, Luma8(0));
        assert_eq!(Rgba8::OPAQUE_ZERO, Rgba8::new(0, 0, 0, 255));
        assert_eq!(PremultipliedRgba8::OPAQUE_ZERO, PremultipliedRgba8::new(0, 0, 0, 255));
    }

    #[test]
    fn test_premultiply_half_alpha() {
        let premultiplied = PremultipliedRgba8::from_straight(Rgba8::new(200, 100, 0, 128));
        assert_eq!(premultiplied, PremultipliedRgba8::new(100, 50, 0, 128));
    }

    #[test]
    fn test_premultiply_opaque_is_unchanged() {
        let straight = Rgba8::opaque(12, 34, 56);
        let premultiplied = PremultipliedRgba8::from_straight(straight);
        assert_eq!(premultiplied.to_straight(), straight);
    }

    #[test]
    fn test_unpremultiply_transparent() {
        assert_eq!(
            PremultipliedRgba8::new(0, 0, 0, 0).to_straight(),
            Rgba8::new(0, 0, 0, 0)
        );
    }
}
