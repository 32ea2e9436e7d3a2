//! Target aspect ratios for the crop window.

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryError;

/// Sentinel for "use the source image's own ratio".
pub const SOURCE_IMAGE_ASPECT_RATIO: f64 = 0.0;

/// A selectable crop ratio, e.g. `16:9`, or the source image's ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio {
    /// Display label; `None` means "derive from the numbers".
    #[serde(default)]
    pub label: Option<String>,
    pub ratio_x: f64,
    pub ratio_y: f64,
}

impl AspectRatio {
    /// Create a ratio, checking that both sides are positive or both are the
    /// source sentinel.
    pub fn new(label: Option<String>, ratio_x: f64, ratio_y: f64) -> Result<Self, GeometryError> {
        let ratio = Self {
            label,
            ratio_x,
            ratio_y,
        };
        ratio.validate()?;
        Ok(ratio)
    }

    /// The "keep the source image's ratio" entry.
    pub fn source(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ratio_x: SOURCE_IMAGE_ASPECT_RATIO,
            ratio_y: SOURCE_IMAGE_ASPECT_RATIO,
        }
    }

    /// True for the "keep the source ratio" entry.
    pub fn is_source(&self) -> bool {
        self.ratio_x == SOURCE_IMAGE_ASPECT_RATIO && self.ratio_y == SOURCE_IMAGE_ASPECT_RATIO
    }

    /// Check both sides are positive, unless this is the source entry.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.is_source() {
            return Ok(());
        }
        GeometryError::check_positive("aspect ratio x", self.ratio_x)?;
        GeometryError::check_positive("aspect ratio y", self.ratio_y)
    }

    /// Width/height ratio, resolving the source sentinel against the native
    /// bitmap dimensions captured at load time.
    pub fn resolve(&self, native_width: f64, native_height: f64) -> Result<f64, GeometryError> {
        self.validate()?;
        if self.is_source() {
            GeometryError::check_positive("native width", native_width)?;
            GeometryError::check_positive("native height", native_height)?;
            return Ok(native_width / native_height);
        }
        Ok(self.ratio_x / self.ratio_y)
    }

    /// Label shown to the user: the explicit label or `x:y`.
    pub fn title(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{}:{}", self.ratio_x, self.ratio_y),
        }
    }

    /// The ratio list offered when the caller configures none.
    pub fn defaults() -> Vec<AspectRatio> {
        vec![
            Self::fixed(1.0, 1.0),
            Self::fixed(3.0, 4.0),
            Self::source("ORIGINAL"),
            Self::fixed(3.0, 2.0),
            Self::fixed(16.0, 9.0),
        ]
    }

    fn fixed(ratio_x: f64, ratio_y: f64) -> Self {
        Self {
            label: None,
            ratio_x,
            ratio_y,
        }
    }
}

/// Index into [`AspectRatio::defaults`] selected when nothing else is chosen.
pub const DEFAULT_ASPECT_RATIO_INDEX: usize = 2;
