//! Viewport geometry: rectangles, the image transform matrix and bounds fitting.
//!
//! # Coordinate System
//!
//! - All rectangles are in viewport coordinates (origin top-left, y down)
//! - Rotation angles are in degrees, positive = clockwise on screen
//! - Scale maps bitmap pixels to viewport units

mod fit;
mod matrix;
mod rect;

use thiserror::Error;

pub use fit::{
    calculate_crop_rect, fit_image_to_crop, image_covers_crop, initial_placement, scale_bounds,
    zoomed_overlay_rect, FitAdjustment, FIT_EPSILON,
};
pub use matrix::{normalize_degrees, Affine};
pub use rect::{Point, Rect};

/// Errors for geometry inputs that cannot describe a real placement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A rectangle with zero, negative or non-finite area.
    #[error("{what} has no area: {rect:?}")]
    EmptyRect { what: &'static str, rect: Rect },

    /// A scalar that must be finite and positive.
    #[error("{what} must be finite and positive, got {value}")]
    InvalidValue { what: &'static str, value: f64 },
}

impl GeometryError {
    pub(crate) fn check_rect(what: &'static str, rect: &Rect) -> Result<(), GeometryError> {
        if rect.is_empty() {
            return Err(GeometryError::EmptyRect { what, rect: *rect });
        }
        Ok(())
    }

    pub(crate) fn check_positive(what: &'static str, value: f64) -> Result<(), GeometryError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(GeometryError::InvalidValue { what, value });
        }
        Ok(())
    }
}
