use image::{ImageReader, Limits};
use ndarray::Array3;
use std::io::Cursor;

use super::error::ClassifierError;

pub const MAX_IMAGE_DIMENSION: u32 = 8192;
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decodes an encoded image (JPEG, PNG, ...) into an `(height, width, 3)` RGB grid.
///
/// Images wider or taller than `MAX_IMAGE_DIMENSION` are rejected before
/// their pixels are allocated.
pub fn decode_image(bytes: &[u8]) -> Result<Array3<u8>, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::Decode("empty image buffer".into()));
    }

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClassifierError::Decode(e.to_string()))?;
    reader.limits(decode_limits());

    let rgb = reader.decode()?.into_rgb8();
    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw())
        .map_err(|e| ClassifierError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_png_in_rgb_order() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(2, 1, Rgb([10, 20, 30]));

        let decoded = decode_image(&encode(&img, ImageFormat::Png)).unwrap();
        assert_eq!(decoded.dim(), (2, 3, 3));
        assert_eq!(decoded[[0, 0, 0]], 255);
        assert_eq!(decoded[[0, 0, 1]], 0);
        assert_eq!(decoded[[1, 2, 0]], 10);
        assert_eq!(decoded[[1, 2, 1]], 20);
        assert_eq!(decoded[[1, 2, 2]], 30);
    }

    #[test]
    fn decodes_jpeg() {
        let img = RgbImage::from_pixel(16, 8, Rgb([120, 130, 140]));
        let decoded = decode_image(&encode(&img, ImageFormat::Jpeg)).unwrap();
        assert_eq!(decoded.dim(), (8, 16, 3));
    }

    #[test]
    fn rejects_oversized_dimensions() {
        let wide = RgbImage::new(MAX_IMAGE_DIMENSION + 1, 1);
        let result = decode_image(&encode(&wide, ImageFormat::Png));
        assert!(matches!(result, Err(ClassifierError::Decode(_))));

        let tall = RgbImage::new(1, MAX_IMAGE_DIMENSION + 1);
        let result = decode_image(&encode(&tall, ImageFormat::Png));
        assert!(matches!(result, Err(ClassifierError::Decode(_))));
    }

    #[test]
    fn accepts_largest_allowed_width() {
        let img = RgbImage::new(MAX_IMAGE_DIMENSION, 1);
        let decoded = decode_image(&encode(&img, ImageFormat::Png)).unwrap();
        assert_eq!(decoded.dim(), (1, MAX_IMAGE_DIMENSION as usize, 3));
    }

    #[test]
    fn rejects_empty_buffer() {
        assert!(matches!(decode_image(&[]), Err(ClassifierError::Decode(_))));
    }

    #[test]
    fn rejects_garbage() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(ClassifierError::Decode(_))));
    }
}
