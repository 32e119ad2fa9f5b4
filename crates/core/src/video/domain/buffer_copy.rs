use crate::shared::image::Image;
use crate::shared::pixel::Pixel;
use crate::video::domain::encode_target::RawBufferMut;
use crate::video::domain::video_asset::RawBuffer;

/// Copies a decoded native buffer into `dst`, converting every pixel to
/// public channel order.
///
/// Padded rows are copied one at a time using the source stride; a tightly
/// packed source is copied in a single pass. Empty images touch nothing.
pub fn copy_from_native<P: Pixel>(src: &RawBuffer<'_>, dst: &mut Image<P>) {
    assert_eq!(
        src.format(),
        P::NATIVE_FORMAT,
        "buffer format does not match the pixel type"
    );
    assert_eq!(
        (src.width(), src.height()),
        dst.size(),
        "buffer size does not match the image size"
    );
    if dst.is_empty() {
        return;
    }

    let width = dst.width() as usize;
    let row_bytes = width * std::mem::size_of::<P>();
    let stride = src.bytes_per_row();
    let data = src.data();

    if stride == row_bytes {
        let len = row_bytes * dst.height() as usize;
        read_converted(&data[..len], dst.pixels_mut());
    } else {
        for (row, out) in dst.pixels_mut().chunks_exact_mut(width).enumerate() {
            let start = row * stride;
            read_converted(&data[start..start + row_bytes], out);
        }
    }
}

/// Copies `src` into an encoder buffer, converting every pixel to native
/// channel order. Destination row padding is left untouched.
pub fn copy_to_native<P: Pixel>(src: &Image<P>, dst: &mut RawBufferMut<'_>) {
    assert_eq!(
        dst.format(),
        P::NATIVE_FORMAT,
        "buffer format does not match the pixel type"
    );
    assert_eq!(
        (dst.width(), dst.height()),
        src.size(),
        "buffer size does not match the image size"
    );
    if src.is_empty() {
        return;
    }

    let row_bytes = src.width() as usize * std::mem::size_of::<P>();
    let stride = dst.bytes_per_row();
    let data = dst.data_mut();

    if stride == row_bytes {
        let len = row_bytes * src.height() as usize;
        write_converted(src.pixels(), &mut data[..len]);
    } else {
        for (row, pixels) in src.rows().enumerate() {
            let start = row * stride;
            write_converted(pixels, &mut data[start..start + row_bytes]);
        }
    }
}

/// Allocates an image of the buffer's size and fills it from the buffer.
pub fn image_from_native<P: Pixel>(src: &RawBuffer<'_>) -> Image<P> {
    let mut image = Image::opaque_zero(src.width(), src.height());
    copy_from_native(src, &mut image);
    image
}

fn read_converted<P: Pixel>(native: &[u8], out: &mut [P]) {
    bytemuck::cast_slice_mut::<P, u8>(out).copy_from_slice(native);
    out.iter_mut().for_each(P::from_native);
}

fn write_converted<P: Pixel>(pixels: &[P], native: &mut [u8]) {
    for (pixel, chunk) in pixels
        .iter()
        .zip(native.chunks_exact_mut(std::mem::size_of::<P>()))
    {
        let mut converted = *pixel;
        converted.to_native();
        chunk.copy_from_slice(bytemuck::bytes_of(&converted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::native_format::NativeFormat;
    use crate::shared::pixel::{Luma8, PremultipliedRgba8, Rgba8};

    fn bgra_bytes(width: u32, height: u32, stride: usize) -> Vec<u8> {
        let mut data = vec![0xEE; stride * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let offset = y * stride + x * 4;
                data[offset..offset + 4].copy_from_slice(&[x as u8, y as u8, 100, 255]);
            }
        }
        data
    }

    #[test]
    fn test_tight_buffer_swaps_red_and_blue() {
        let data = bgra_bytes(3, 2, 12);
        let buffer = RawBuffer::new(&data, 3, 2, 12, NativeFormat::Bgra32);
        let image: Image<Rgba8> = image_from_native(&buffer);
        assert_eq!(image.pixel(2, 1), Rgba8::new(100, 1, 2, 255));
        assert_eq!(image.pixel(0, 0), Rgba8::new(100, 0, 0, 255));
    }

    #[test]
    fn test_padded_buffer_skips_padding() {
        let data = bgra_bytes(3, 2, 16);
        let buffer = RawBuffer::new(&data, 3, 2, 16, NativeFormat::Bgra32);
        let image: Image<PremultipliedRgba8> = image_from_native(&buffer);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(
                    image.pixel(x, y),
                    PremultipliedRgba8::new(100, y as u8, x as u8, 255)
                );
            }
        }
    }

    #[test]
    fn test_luma_copies_bytes_verbatim() {
        let data = [1u8, 2, 3, 0, 4, 5, 6, 0];
        let buffer = RawBuffer::new(&data, 3, 2, 4, NativeFormat::Gray8);
        let image: Image<Luma8> = image_from_native(&buffer);
        assert_eq!(image.as_bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_zero_sized_buffer_is_noop() {
        let buffer = RawBuffer::new(&[], 0, 0, 0, NativeFormat::Bgra32);
        let image: Image<Rgba8> = image_from_native(&buffer);
        assert!(image.is_empty());
    }

    #[test]
    fn test_to_native_respects_stride_and_keeps_padding() {
        let mut image = Image::<Rgba8>::opaque_zero(2, 2);
        image.set_pixel(1, 1, Rgba8::new(10, 20, 30, 40));
        let mut data = vec![0xAB; 12 + 8];
        let mut buffer = RawBufferMut::new(&mut data, 2, 2, 12, NativeFormat::Bgra32);
        copy_to_native(&image, &mut buffer);
        assert_eq!(&data[8..12], &[0xAB; 4]);
        assert_eq!(&data[16..20], &[30, 20, 10, 40]);
        assert_eq!(&data[0..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_native_roundtrip_through_padded_buffer() {
        let pixels = (0..12u8).map(|i| Rgba8::new(i, i * 2, i * 3, 255 - i)).collect();
        let image = Image::from_pixels(4, 3, pixels);
        let mut data = vec![0; 32 * 3];
        copy_to_native(
            &image,
            &mut RawBufferMut::new(&mut data, 4, 3, 32, NativeFormat::Bgra32),
        );
        let decoded: Image<Rgba8> =
            image_from_native(&RawBuffer::new(&data, 4, 3, 32, NativeFormat::Bgra32));
        assert_eq!(decoded, image);
    }

    #[test]
    #[should_panic(expected = "buffer format does not match the pixel type")]
    fn test_format_mismatch_panics() {
        let data = [0u8; 4];
        let buffer = RawBuffer::new(&data, 2, 2, 2, NativeFormat::Gray8);
        let _: Image<Rgba8> = image_from_native(&buffer);
    }
}
