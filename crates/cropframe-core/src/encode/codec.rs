//! Output encoding for cropped bitmaps.
//!
//! JPEG drops the alpha channel (transparent areas come out black); PNG and
//! lossless WebP keep it.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;
use thiserror::Error;

use crate::decode::Bitmap;
use crate::model::OutputFormat;

/// Errors that can occur while encoding the output.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The encoder rejected the image
    #[error("{format:?} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

/// Encode a bitmap in the requested format.
///
/// `quality` (clamped to 1-100) only affects JPEG.
///
/// # Errors
///
/// Returns `EncodeError::InvalidDimensions` for a zero-sized bitmap,
/// `EncodeError::InvalidPixelData` for a buffer that doesn't match its
/// dimensions, and `EncodeError::EncodingFailed` if the codec fails.
pub fn encode_bitmap(
    bitmap: &Bitmap,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (bitmap.width, bitmap.height);
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = width as usize * height as usize * Bitmap::CHANNELS;
    if bitmap.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: bitmap.pixels.len(),
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    let failed = |e: image::ImageError| EncodeError::EncodingFailed {
        format,
        message: e.to_string(),
    };

    match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            encoder
                .write_image(&bitmap.to_rgb_pixels(), width, height, ExtendedColorType::Rgb8)
                .map_err(failed)?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(&bitmap.pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
        OutputFormat::WebP => {
            WebPEncoder::new_lossless(&mut buffer)
                .write_image(&bitmap.pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Bitmap {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 255]);
            }
        }
        Bitmap::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_encode_jpeg_markers() {
        let jpeg = encode_bitmap(&gradient(100, 100), OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_bitmap(&gradient(16, 8), OutputFormat::Png, 90).unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_encode_webp_signature() {
        let webp = encode_bitmap(&gradient(16, 8), OutputFormat::WebP, 90).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn test_png_keeps_alpha() {
        let bmp = Bitmap::filled(3, 3, [10, 20, 30, 0]);
        let png = encode_bitmap(&bmp, OutputFormat::Png, 90).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().into_rgba8();
        assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30, 0]);
    }

    #[test]
    fn test_jpeg_quality_affects_size() {
        let bmp = gradient(64, 64);
        let low = encode_bitmap(&bmp, OutputFormat::Jpeg, 10).unwrap();
        let high = encode_bitmap(&bmp, OutputFormat::Jpeg, 100).unwrap();
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_quality_clamping() {
        let bmp = Bitmap::filled(10, 10, [128, 128, 128, 255]);
        assert!(encode_bitmap(&bmp, OutputFormat::Jpeg, 0).is_ok());
        assert!(encode_bitmap(&bmp, OutputFormat::Jpeg, 255).is_ok());
    }

    #[test]
    fn test_invalid_pixel_data() {
        let bmp = Bitmap {
            width: 10,
            height: 10,
            pixels: vec![0; 10 * 9 * 4],
        };
        assert!(matches!(
            encode_bitmap(&bmp, OutputFormat::Png, 90),
            Err(EncodeError::InvalidPixelData { .. })
        ));
    }

    #[test]
    fn test_zero_dimensions() {
        let bmp = Bitmap {
            width: 0,
            height: 10,
            pixels: vec![],
        };
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP] {
            assert!(matches!(
                encode_bitmap(&bmp, format, 90),
                Err(EncodeError::InvalidDimensions { .. })
            ));
        }
    }
}
