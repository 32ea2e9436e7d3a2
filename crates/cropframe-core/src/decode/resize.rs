//! Bitmap resampling.
//!
//! Both functions consume their input so the caller never holds two
//! full-size buffers longer than the resize itself.

use super::{Bitmap, DecodeError, FilterType};

/// Resize a bitmap to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` for a zero target size and
/// `DecodeError::InvalidPixelData` if the source buffer is inconsistent.
pub fn resize(
    bitmap: Bitmap,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<Bitmap, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    // Fast path: dimensions already match
    if bitmap.width == width && bitmap.height == height {
        return Ok(bitmap);
    }

    let resized = {
        let view = bitmap.as_view().ok_or(DecodeError::InvalidPixelData {
            expected: bitmap.width as usize * bitmap.height as usize * Bitmap::CHANNELS,
            actual: bitmap.byte_size(),
        })?;
        image::imageops::resize(&view, width, height, filter.to_image_filter())
    };

    Ok(Bitmap::from_rgba_image(resized))
}

/// Scale a bitmap by `factor`, rounding each side to the nearest pixel.
///
/// Sides never drop below one pixel.
pub fn scale_bitmap(bitmap: Bitmap, factor: f64, filter: FilterType) -> Result<Bitmap, DecodeError> {
    let (width, height) = scaled_dimensions(bitmap.width, bitmap.height, factor);
    resize(bitmap, width, height, filter)
}

/// Dimensions of a `width x height` bitmap scaled by `factor`.
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |side: u32| ((side as f64 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}
