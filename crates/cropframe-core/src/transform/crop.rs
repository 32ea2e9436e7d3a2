//! Pixel-region extraction.
//!
//! Regions are whole pixels in the working bitmap's own coordinates. A region
//! that leaves the bitmap is an error; it is never clamped, since clamping
//! would silently change the output aspect ratio.

use crate::decode::Bitmap;
use crate::error::CropError;

/// Copy the `width x height` region at `(x, y)` out of `bitmap`.
///
/// # Errors
///
/// Returns `CropError::RegionOutOfBounds` when the region is empty or any
/// part of it lies outside the bitmap.
pub fn extract_region(
    bitmap: &Bitmap,
    x: i64,
    y: i64,
    width: i64,
    height: i64,
) -> Result<Bitmap, CropError> {
    let out_of_bounds = || CropError::RegionOutOfBounds {
        x,
        y,
        width,
        height,
        bitmap_width: bitmap.width,
        bitmap_height: bitmap.height,
    };

    if width <= 0 || height <= 0 || x < 0 || y < 0 {
        return Err(out_of_bounds());
    }
    if x + width > bitmap.width as i64 || y + height > bitmap.height as i64 {
        return Err(out_of_bounds());
    }

    // Fast path: the region is the whole bitmap
    if x == 0 && y == 0 && width == bitmap.width as i64 && height == bitmap.height as i64 {
        return Ok(bitmap.clone());
    }

    let stride = bitmap.width as usize * Bitmap::CHANNELS;
    let row_len = width as usize * Bitmap::CHANNELS;
    let start_x = x as usize * Bitmap::CHANNELS;
    let expected = stride * bitmap.height as usize;
    if bitmap.pixels.len() != expected {
        return Err(out_of_bounds());
    }

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in y as usize..(y + height) as usize {
        let start = row * stride + start_x;
        pixels.extend_from_slice(&bitmap.pixels[start..start + row_len]);
    }

    Ok(Bitmap {
        width: width as u32,
        height: height as u32,
        pixels,
    })
}
