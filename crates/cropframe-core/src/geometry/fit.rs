//! Bounds fitting between the image, the crop window and the viewport.
//!
//! All functions here are pure: they take a snapshot of rectangles and
//! transform values and return the adjustment to apply, leaving the
//! mutation to the caller.

use super::{Affine, GeometryError, Point, Rect};

/// Tolerance for floating-point containment checks, in viewport units.
pub const FIT_EPSILON: f64 = 1e-6;

/// Translation and scale that make the image cover the crop window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitAdjustment {
    /// Horizontal translation in viewport coordinates.
    pub translate_x: f64,
    /// Vertical translation in viewport coordinates.
    pub translate_y: f64,
    /// Multiplier applied about the image center (>= 1).
    pub scale_multiplier: f64,
    /// Resulting absolute scale (`scale * scale_multiplier`).
    pub scale: f64,
}

impl FitAdjustment {
    /// True when the image already covers the crop window.
    pub fn is_noop(&self) -> bool {
        self.translate_x.abs() < FIT_EPSILON
            && self.translate_y.abs() < FIT_EPSILON
            && (self.scale_multiplier - 1.0).abs() < FIT_EPSILON
    }
}

/// Compute the translation and scale needed for the image to cover `crop_rect`.
///
/// `image_rect` is the image's unrotated frame: an axis-aligned rectangle in
/// the image's own orientation, centered on the image center, sized
/// `bitmap * scale`. The image itself is that frame rotated by `angle`
/// degrees about its center.
///
/// The crop corners are rotated into the image frame, so the fit accounts
/// for the rotated extent of the image rather than its unrotated box. The
/// image is first scaled about its center by the smallest multiplier that
/// lets the frame span the rotated crop bounds, then translated by the
/// smallest offset that covers them. Translation is reported in viewport
/// coordinates and applies after the scale.
///
/// # Errors
///
/// Returns `GeometryError` when either rectangle has zero area, or when
/// `scale`/`angle` are not finite (or `scale` is not positive).
pub fn fit_image_to_crop(
    image_rect: &Rect,
    crop_rect: &Rect,
    scale: f64,
    angle: f64,
) -> Result<FitAdjustment, GeometryError> {
    GeometryError::check_rect("image rect", image_rect)?;
    GeometryError::check_rect("crop rect", crop_rect)?;
    GeometryError::check_positive("scale", scale)?;
    if !angle.is_finite() {
        return Err(GeometryError::InvalidValue {
            what: "angle",
            value: angle,
        });
    }

    let center = image_rect.center();
    let half_w = image_rect.width() / 2.0;
    let half_h = image_rect.height() / 2.0;

    // Crop bounds expressed in the image frame, relative to the image center.
    let to_image_frame = Affine::rotation(-angle, center);
    let local_corners = crop_rect.corners().map(|corner| {
        let p = to_image_frame.map_point(corner);
        Point::new(p.x - center.x, p.y - center.y)
    });
    let local = Rect::bounding(&local_corners);

    let scale_multiplier = (local.width() / image_rect.width())
        .max(local.height() / image_rect.height())
        .max(1.0);
    let (half_w, half_h) = (half_w * scale_multiplier, half_h * scale_multiplier);

    // Image spans [shift - half, shift + half]; pick the shift closest to
    // zero that still contains [local.left, local.right].
    let shift_x = minimal_shift(local.left, local.right, half_w);
    let shift_y = minimal_shift(local.top, local.bottom, half_h);

    let to_viewport = Affine::rotation(angle, Point::new(0.0, 0.0));
    let translation = to_viewport.map_vector(shift_x, shift_y);

    Ok(FitAdjustment {
        translate_x: translation.x,
        translate_y: translation.y,
        scale_multiplier,
        scale: scale * scale_multiplier,
    })
}

fn minimal_shift(low: f64, high: f64, half_extent: f64) -> f64 {
    let min_shift = high - half_extent;
    let max_shift = low + half_extent;
    if min_shift > max_shift {
        // Only reachable through rounding; center on the crop span.
        return (low + high) / 2.0;
    }
    0.0_f64.clamp(min_shift, max_shift)
}

/// Whether the image frame, rotated by `angle`, covers `crop_rect`.
pub fn image_covers_crop(image_rect: &Rect, crop_rect: &Rect, angle: f64) -> bool {
    let center = image_rect.center();
    let to_image_frame = Affine::rotation(-angle, center);
    crop_rect
        .corners()
        .iter()
        .all(|&corner| image_rect.contains_point(to_image_frame.map_point(corner), FIT_EPSILON * 10.0))
}

/// Largest rectangle with the given width/height ratio, centered in the viewport.
///
/// The axis that limits the ratio is filled; the other is letterboxed
/// equally on both sides.
///
/// # Errors
///
/// Returns `GeometryError` for an empty viewport or a non-positive ratio.
pub fn calculate_crop_rect(viewport_rect: &Rect, ratio: f64) -> Result<Rect, GeometryError> {
    GeometryError::check_rect("viewport rect", viewport_rect)?;
    GeometryError::check_positive("aspect ratio", ratio)?;

    let width = viewport_rect.width();
    let height = viewport_rect.height();

    let (crop_w, crop_h) = if width / ratio > height {
        (height * ratio, height)
    } else {
        (width, width / ratio)
    };

    Ok(Rect::centered(viewport_rect.center(), crop_w, crop_h))
}

/// The crop window scaled uniformly to fill as much of the viewport as
/// possible, centered in it.
pub fn zoomed_overlay_rect(viewport_rect: &Rect, crop_rect: &Rect) -> Result<Rect, GeometryError> {
    GeometryError::check_rect("viewport rect", viewport_rect)?;
    GeometryError::check_rect("crop rect", crop_rect)?;

    let scale = (viewport_rect.width() / crop_rect.width()).min(viewport_rect.height() / crop_rect.height());
    Ok(Rect::centered(
        viewport_rect.center(),
        crop_rect.width() * scale,
        crop_rect.height() * scale,
    ))
}

/// Minimum and maximum user scale for a bitmap inside a crop window.
///
/// The minimum lets the bitmap shrink until its longer side matches the
/// shorter crop side in any orientation; the maximum is that times
/// `max_scale_multiplier`.
pub fn scale_bounds(
    crop_rect: &Rect,
    bitmap_width: f64,
    bitmap_height: f64,
    max_scale_multiplier: f64,
) -> Result<(f64, f64), GeometryError> {
    GeometryError::check_rect("crop rect", crop_rect)?;
    GeometryError::check_positive("bitmap width", bitmap_width)?;
    GeometryError::check_positive("bitmap height", bitmap_height)?;
    GeometryError::check_positive("max scale multiplier", max_scale_multiplier)?;

    let width_scale = (crop_rect.width() / bitmap_width).min(crop_rect.width() / bitmap_height);
    let height_scale = (crop_rect.height() / bitmap_height).min(crop_rect.height() / bitmap_width);
    let min_scale = width_scale.min(height_scale);
    Ok((min_scale, min_scale * max_scale_multiplier))
}

/// Matrix placing the bitmap so it just covers the crop window, centered on it.
pub fn initial_placement(
    crop_rect: &Rect,
    bitmap_width: f64,
    bitmap_height: f64,
) -> Result<Affine, GeometryError> {
    GeometryError::check_rect("crop rect", crop_rect)?;
    GeometryError::check_positive("bitmap width", bitmap_width)?;
    GeometryError::check_positive("bitmap height", bitmap_height)?;

    let scale = (crop_rect.width() / bitmap_width).max(crop_rect.height() / bitmap_height);
    let tx = (crop_rect.width() - bitmap_width * scale) / 2.0 + crop_rect.left;
    let ty = (crop_rect.height() - bitmap_height * scale) / 2.0 + crop_rect.top;

    let mut matrix = Affine::scaling(scale, Point::new(0.0, 0.0));
    matrix.post_translate(tx, ty);
    Ok(matrix)
}
