//! Live transform model driven by the crop view.
//!
//! Holds the bitmap placement matrix, the fixed viewport and the crop
//! window, and keeps gesture input inside the configured scale range. The
//! view mutates it while the user interacts and calls [`TransformState::snapshot`]
//! when the crop is confirmed.

use serde::{Deserialize, Serialize};

use crate::geometry::{
    calculate_crop_rect, fit_image_to_crop, image_covers_crop, initial_placement,
    normalize_degrees, scale_bounds, Affine, FitAdjustment, GeometryError, Point, Rect,
};
use crate::model::{AspectRatio, ImageState};

pub const DEFAULT_MAX_SCALE_MULTIPLIER: f64 = 10.0;

/// Relative scale change below which a gesture is treated as a no-op.
const SCALE_TOLERANCE: f64 = 1e-9;

/// Which gestures may change the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureFlags {
    pub scale: bool,
    pub rotate: bool,
}

impl Default for GestureFlags {
    fn default() -> Self {
        Self {
            scale: true,
            rotate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformState {
    bitmap_width: f64,
    bitmap_height: f64,
    matrix: Affine,
    viewport: Rect,
    crop_rect: Rect,
    min_scale: f64,
    max_scale: f64,
    max_scale_multiplier: f64,
    target_aspect_ratio: f64,
    gestures: GestureFlags,
}

impl TransformState {
    /// Place a bitmap in the viewport with a crop window of the bitmap's own
    /// ratio, scaled so the bitmap just covers it.
    pub fn new(bitmap_width: u32, bitmap_height: u32, viewport: Rect) -> Result<Self, GeometryError> {
        let (bw, bh) = (bitmap_width as f64, bitmap_height as f64);
        GeometryError::check_positive("bitmap width", bw)?;
        GeometryError::check_positive("bitmap height", bh)?;

        let ratio = bw / bh;
        let crop_rect = calculate_crop_rect(&viewport, ratio)?;
        let (min_scale, max_scale) = scale_bounds(&crop_rect, bw, bh, DEFAULT_MAX_SCALE_MULTIPLIER)?;

        Ok(Self {
            bitmap_width: bw,
            bitmap_height: bh,
            matrix: initial_placement(&crop_rect, bw, bh)?,
            viewport,
            crop_rect,
            min_scale,
            max_scale,
            max_scale_multiplier: DEFAULT_MAX_SCALE_MULTIPLIER,
            target_aspect_ratio: ratio,
            gestures: GestureFlags::default(),
        })
    }

    /// Builder form of [`TransformState::set_gestures`].
    pub fn with_gestures(mut self, gestures: GestureFlags) -> Self {
        self.gestures = gestures;
        self
    }

    /// Enable or disable the scale and rotate gestures.
    pub fn set_gestures(&mut self, gestures: GestureFlags) {
        self.gestures = gestures;
    }

    /// Change how far past the minimum scale the user may zoom in.
    pub fn set_max_scale_multiplier(&mut self, multiplier: f64) -> Result<(), GeometryError> {
        GeometryError::check_positive("max scale multiplier", multiplier)?;
        self.max_scale_multiplier = multiplier;
        self.update_scale_bounds()
    }

    /// Current bitmap-to-viewport matrix.
    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    /// The fixed area the view draws into.
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// The crop window, in viewport coordinates.
    pub fn crop_rect(&self) -> Rect {
        self.crop_rect
    }

    /// Native bitmap width and height.
    pub fn bitmap_size(&self) -> (f64, f64) {
        (self.bitmap_width, self.bitmap_height)
    }

    /// Smallest scale gestures can reach.
    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    /// Largest scale gestures can reach.
    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    /// Width/height ratio of the crop window.
    pub fn target_aspect_ratio(&self) -> f64 {
        self.target_aspect_ratio
    }

    /// Uniform scale of the matrix.
    pub fn current_scale(&self) -> f64 {
        self.matrix.scale()
    }

    /// Rotation in degrees within `(-180, 180]`.
    pub fn current_angle(&self) -> f64 {
        self.matrix.angle()
    }

    /// Rotation in degrees within `[0, 360)`.
    pub fn rotation_degrees(&self) -> f64 {
        normalize_degrees(self.current_angle())
    }

    /// Switch the crop window to a new ratio and refit the image.
    pub fn set_target_aspect_ratio(&mut self, ratio: &AspectRatio) -> Result<(), GeometryError> {
        let ratio = ratio.resolve(self.bitmap_width, self.bitmap_height)?;
        let crop_rect = calculate_crop_rect(&self.viewport, ratio)?;
        self.target_aspect_ratio = ratio;
        self.crop_rect = crop_rect;
        self.update_scale_bounds()?;
        self.wrap_crop_bounds()?;
        Ok(())
    }

    /// Move the crop window, clamped to the viewport.
    pub fn set_crop_rect(&mut self, rect: Rect) -> Result<(), GeometryError> {
        let clamped = self.viewport.intersect(&rect).ok_or(GeometryError::EmptyRect {
            what: "crop rect",
            rect,
        })?;
        self.crop_rect = clamped;
        self.target_aspect_ratio = clamped.width() / clamped.height();
        self.update_scale_bounds()
    }

    /// Pan the image by `(dx, dy)` viewport units. Not clamped.
    pub fn post_translate(&mut self, dx: f64, dy: f64) {
        if dx != 0.0 || dy != 0.0 {
            self.matrix.post_translate(dx, dy);
        }
    }

    /// Scale by `factor` about `pivot`, clamped to the scale range.
    ///
    /// Returns false when scaling is disabled or the scale is already at the
    /// limit in that direction.
    pub fn post_scale(&mut self, factor: f64, pivot: Point) -> bool {
        if !self.gestures.scale || !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        self.scale_to(self.current_scale() * factor, pivot)
    }

    /// Zoom to an absolute scale about `pivot`, clamped to the scale range.
    pub fn zoom_to(&mut self, scale: f64, pivot: Point) -> bool {
        if !scale.is_finite() || scale <= 0.0 {
            return false;
        }
        self.scale_to(scale, pivot)
    }

    fn scale_to(&mut self, target: f64, pivot: Point) -> bool {
        let current = self.current_scale();
        let target = target.clamp(self.min_scale, self.max_scale);
        if (target - current).abs() <= SCALE_TOLERANCE * current {
            return false;
        }
        self.matrix.post_scale(target / current, pivot);
        true
    }

    /// Rotate clockwise by `degrees` about `pivot`, if rotation is enabled.
    pub fn post_rotate(&mut self, degrees: f64, pivot: Point) -> bool {
        if !self.gestures.rotate || !degrees.is_finite() || degrees == 0.0 {
            return false;
        }
        self.matrix.post_rotate(degrees, pivot);
        true
    }

    /// Rotate about the crop window center.
    pub fn rotate_by(&mut self, degrees: f64) -> bool {
        self.post_rotate(degrees, self.crop_rect.center())
    }

    /// Undo any rotation about the crop window center.
    pub fn reset_rotation(&mut self) {
        let angle = self.current_angle();
        if angle != 0.0 {
            self.matrix.post_rotate(-angle, self.crop_rect.center());
        }
    }

    /// The bitmap's corners in viewport coordinates, clockwise from its top-left.
    pub fn image_corners(&self) -> [Point; 4] {
        Rect::new(0.0, 0.0, self.bitmap_width, self.bitmap_height)
            .corners()
            .map(|corner| self.matrix.map_point(corner))
    }

    /// Axis-aligned bounding box of the transformed bitmap.
    pub fn image_rect(&self) -> Rect {
        Rect::bounding(&self.image_corners())
    }

    /// Bitmap center in viewport coordinates.
    pub fn image_center(&self) -> Point {
        self.matrix
            .map_point(Point::new(self.bitmap_width / 2.0, self.bitmap_height / 2.0))
    }

    /// The transformed bitmap with its rotation taken out: centered on the
    /// image center, sized `bitmap * scale`.
    pub fn image_frame(&self) -> Rect {
        let scale = self.current_scale();
        Rect::centered(
            self.image_center(),
            self.bitmap_width * scale,
            self.bitmap_height * scale,
        )
    }

    /// Whether the rotated image covers every point of the crop window.
    pub fn is_image_wrapping_crop(&self) -> bool {
        image_covers_crop(&self.image_frame(), &self.crop_rect, self.current_angle())
    }

    /// Translate and scale the image so it covers the crop window.
    ///
    /// Coverage takes priority over the maximum scale: a tiny crop window on
    /// a rotated image may push the scale past `max_scale`.
    pub fn wrap_crop_bounds(&mut self) -> Result<FitAdjustment, GeometryError> {
        let fit = fit_image_to_crop(
            &self.image_frame(),
            &self.crop_rect,
            self.current_scale(),
            self.current_angle(),
        )?;
        if !fit.is_noop() {
            let center = self.image_center();
            self.matrix.post_scale(fit.scale_multiplier, center);
            self.matrix.post_translate(fit.translate_x, fit.translate_y);
        }
        Ok(fit)
    }

    /// Freeze the current placement for a crop request.
    pub fn snapshot(&self) -> ImageState {
        ImageState::new(
            self.crop_rect,
            self.image_rect(),
            self.matrix,
            self.current_scale(),
            self.current_angle(),
        )
    }

    fn update_scale_bounds(&mut self) -> Result<(), GeometryError> {
        let (min_scale, max_scale) = scale_bounds(
            &self.crop_rect,
            self.bitmap_width,
            self.bitmap_height,
            self.max_scale_multiplier,
        )?;
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        Ok(())
    }
}
