use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, GenericImageView, ImageEncoder};

use crate::errors::ServiceError;

const MAX_BLOB_SIZE: usize = 1_000_000;
const MAX_DIMENSION: u32 = 2500;

/// Compresses `bytes` for Bluesky's blob size cap (spec §4.D): downscale
/// so the longest side is at most 2500px, then re-encode as JPEG,
/// decrementing quality from 100 until the result fits in 1,000,000
/// bytes or quality reaches 0.
pub fn compress_for_bluesky(bytes: &[u8]) -> Result<Vec<u8>, ServiceError> {
    if bytes.len() <= MAX_BLOB_SIZE {
        return Ok(bytes.to_vec());
    }

    let image = image::load_from_memory(bytes)?;
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    let resized = if longest > MAX_DIMENSION {
        let (new_w, new_h) = if width >= height {
            (MAX_DIMENSION, (height as f64 * MAX_DIMENSION as f64 / width as f64) as u32)
        } else {
            ((width as f64 * MAX_DIMENSION as f64 / height as f64) as u32, MAX_DIMENSION)
        };
        image.resize(new_w.max(1), new_h.max(1), FilterType::Lanczos3)
    } else {
        image
    };
    let rgb = resized.to_rgb8();

    let mut quality: i16 = 100;
    loop {
        let mut buf = Vec::new();
        {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality as u8);
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )?;
        }
        if buf.len() <= MAX_BLOB_SIZE || quality <= 0 {
            return Ok(buf);
        }
        quality -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn encode_large_png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_small_image_passes_through_unchanged() {
        let small = vec![0u8; 10];
        assert_eq!(compress_for_bluesky(&small).unwrap(), small);
    }

    #[test]
    fn test_large_image_is_compressed_under_cap() {
        let raw = encode_large_png(3000, 2000);
        assert!(raw.len() > MAX_BLOB_SIZE);
        let compressed = compress_for_bluesky(&raw).unwrap();
        assert!(compressed.len() <= MAX_BLOB_SIZE);
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let raw = encode_large_png(3000, 1500);
        let compressed = compress_for_bluesky(&raw).unwrap();
        let decoded = image::load_from_memory(&compressed).unwrap();
        let (w, h) = decoded.dimensions();
        assert!(w.max(h) <= MAX_DIMENSION);
    }
}
