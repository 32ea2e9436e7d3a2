//! Bitmap rotation onto an expanded transparent canvas.
//!
//! The rotation uses inverse mapping: for each output pixel center we find
//! the source position and interpolate bilinearly with premultiplied alpha.
//!
//! For a clockwise rotation by θ (y axis down), the inverse transform is:
//! ```text
//! src_x =  (dst_x - dst_cx) * cos(θ) + (dst_y - dst_cy) * sin(θ) + src_cx
//! src_y = -(dst_x - dst_cx) * sin(θ) + (dst_y - dst_cy) * cos(θ) + src_cy
//! ```

use crate::decode::Bitmap;
use crate::geometry::normalize_degrees;

const ANGLE_EPSILON: f64 = 0.001;

/// Size of the bounding box of a `width x height` bitmap rotated by
/// `angle_degrees`.
///
/// Quarter turns are exact; other angles round each side to the nearest
/// pixel and never return zero.
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    match quarter_turns(angle_degrees) {
        Some(0) | Some(2) => return (width, height),
        Some(_) => return (height, width),
        None => {}
    }

    let angle_rad = angle_degrees.to_radians();
    let cos = angle_rad.cos().abs();
    let sin = angle_rad.sin().abs();

    let w = width as f64;
    let h = height as f64;

    let new_w = (w * cos + h * sin).round() as u32;
    let new_h = (w * sin + h * cos).round() as u32;

    (new_w.max(1), new_h.max(1))
}

/// Rotate a bitmap clockwise by `angle_degrees` about its center.
///
/// The canvas grows to the rotated bounding box; pixels not covered by the
/// source are fully transparent.
pub fn rotate_bitmap(bitmap: Bitmap, angle_degrees: f64) -> Bitmap {
    if let Some(turns) = quarter_turns(angle_degrees) {
        return rotate_quarter_turns(bitmap, turns);
    }

    let (dst_w, dst_h) = compute_rotated_bounds(bitmap.width, bitmap.height, angle_degrees);

    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let src_cx = bitmap.width as f64 / 2.0;
    let src_cy = bitmap.height as f64 / 2.0;
    let dst_cx = dst_w as f64 / 2.0;
    let dst_cy = dst_h as f64 / 2.0;

    let mut output = vec![0u8; dst_w as usize * dst_h as usize * Bitmap::CHANNELS];

    for dst_y in 0..dst_h {
        let dy = dst_y as f64 + 0.5 - dst_cy;
        for dst_x in 0..dst_w {
            let dx = dst_x as f64 + 0.5 - dst_cx;

            // Source position in pixel-center coordinates
            let src_x = dx * cos + dy * sin + src_cx - 0.5;
            let src_y = -dx * sin + dy * cos + src_cy - 0.5;

            let idx = (dst_y as usize * dst_w as usize + dst_x as usize) * Bitmap::CHANNELS;
            output[idx..idx + Bitmap::CHANNELS].copy_from_slice(&sample_bilinear(&bitmap, src_x, src_y));
        }
    }

    Bitmap {
        width: dst_w,
        height: dst_h,
        pixels: output,
    }
}

/// Number of clockwise quarter turns if the angle is a multiple of 90.
fn quarter_turns(angle_degrees: f64) -> Option<u8> {
    let normalized = normalize_degrees(angle_degrees);
    let nearest = (normalized / 90.0).round();
    if (normalized - nearest * 90.0).abs() < ANGLE_EPSILON {
        Some((nearest as u8) % 4)
    } else {
        None
    }
}

fn rotate_quarter_turns(bitmap: Bitmap, turns: u8) -> Bitmap {
    if turns == 0 {
        return bitmap;
    }
    let Some(view) = bitmap.as_view() else {
        return bitmap;
    };
    let rotated = match turns {
        1 => image::imageops::rotate90(&view),
        2 => image::imageops::rotate180(&view),
        _ => image::imageops::rotate270(&view),
    };
    Bitmap::from_rgba_image(rotated)
}

#[inline]
fn pixel_or_transparent(bitmap: &Bitmap, x: i64, y: i64) -> [f64; 4] {
    if x < 0 || y < 0 || x >= bitmap.width as i64 || y >= bitmap.height as i64 {
        return [0.0; 4];
    }
    let idx = (y as usize * bitmap.width as usize + x as usize) * Bitmap::CHANNELS;
    let px = &bitmap.pixels[idx..idx + Bitmap::CHANNELS];
    let alpha = px[3] as f64 / 255.0;
    [
        px[0] as f64 * alpha,
        px[1] as f64 * alpha,
        px[2] as f64 * alpha,
        px[3] as f64,
    ]
}

/// Bilinear sample with premultiplied alpha; outside the bitmap is transparent.
fn sample_bilinear(bitmap: &Bitmap, x: f64, y: f64) -> [u8; 4] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (pixel_or_transparent(bitmap, x0, y0), (1.0 - fx) * (1.0 - fy)),
        (pixel_or_transparent(bitmap, x0 + 1, y0), fx * (1.0 - fy)),
        (pixel_or_transparent(bitmap, x0, y0 + 1), (1.0 - fx) * fy),
        (pixel_or_transparent(bitmap, x0 + 1, y0 + 1), fx * fy),
    ];

    let mut acc = [0.0f64; 4];
    for (px, weight) in taps {
        for (sum, value) in acc.iter_mut().zip(px) {
            *sum += value * weight;
        }
    }

    let alpha = acc[3];
    if alpha < 0.5 {
        return [0; 4];
    }
    let unpremultiply = 255.0 / alpha;
    [
        (acc[0] * unpremultiply).clamp(0.0, 255.0).round() as u8,
        (acc[1] * unpremultiply).clamp(0.0, 255.0).round() as u8,
        (acc[2] * unpremultiply).clamp(0.0, 255.0).round() as u8,
        alpha.clamp(0.0, 255.0).round() as u8,
    ]
}
