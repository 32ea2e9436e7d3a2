//! Frozen transform state handed to the crop engine, and what it reports back.

use serde::{Deserialize, Serialize};

use super::Location;
use crate::geometry::{Affine, Rect};

/// Snapshot of the image placement at the moment a crop is requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageState {
    pub crop_rect: Rect,
    /// Bounding box of the transformed bitmap in viewport coordinates.
    pub current_image_rect: Rect,
    pub matrix: Affine,
    pub current_scale: f64,
    /// Degrees, clockwise on screen.
    pub current_angle: f64,
}

impl ImageState {
    pub fn new(
        crop_rect: Rect,
        current_image_rect: Rect,
        matrix: Affine,
        current_scale: f64,
        current_angle: f64,
    ) -> Self {
        Self {
            crop_rect,
            current_image_rect,
            matrix,
            current_scale,
            current_angle,
        }
    }

    /// Snapshot whose scale and angle are read off the matrix.
    pub fn from_matrix(crop_rect: Rect, current_image_rect: Rect, matrix: Affine) -> Self {
        Self::new(crop_rect, current_image_rect, matrix, matrix.scale(), matrix.angle())
    }
}

/// Geometric facts about a finished crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropResult {
    pub output: Location,
    /// Left edge of the extracted region inside the working bitmap.
    pub offset_x: i64,
    pub offset_y: i64,
    /// Output size in pixels.
    pub width: u32,
    pub height: u32,
    pub matrix_values: [f64; 9],
    pub crop_rect: Rect,
    /// True when the source was copied instead of re-encoded.
    pub copied: bool,
}

impl CropResult {
    /// Output width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}
