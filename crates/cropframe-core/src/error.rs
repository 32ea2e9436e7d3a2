//! Crop request errors.

use std::io;

use thiserror::Error;

use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::geometry::GeometryError;

/// Result alias for crop operations.
pub type Result<T, E = CropError> = std::result::Result<T, E>;

/// Failure of a crop request. The first error ends the request.
#[derive(Debug, Error)]
pub enum CropError {
    /// The source bitmap is absent, empty or could not be produced.
    #[error("Missing source bitmap: {0}")]
    MissingSource(String),

    /// The crop rect or image rect has no area.
    #[error("Empty region: {0}")]
    EmptyRegion(String),

    /// No output location, or the storage cannot write to it.
    #[error("Missing destination: {0}")]
    MissingDestination(String),

    /// Non-finite or non-positive transform values.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    /// The computed extraction rectangle leaves the working bitmap.
    #[error(
        "Crop region {width}x{height}+{x}+{y} is outside the {bitmap_width}x{bitmap_height} bitmap"
    )]
    RegionOutOfBounds {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        bitmap_width: u32,
        bitmap_height: u32,
    },

    /// The storage capability was released before the request finished.
    #[error("Storage context gone: {0}")]
    ContextGone(String),

    /// Reading, copying or writing a location failed.
    #[error("I/O failure while {context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The output bitmap could not be encoded.
    #[error("Encoding failed: {0}")]
    EncodeFailure(#[from] EncodeError),
}

/// Fieldless mirror of [`CropError`] for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropErrorKind {
    MissingSource,
    EmptyRegion,
    MissingDestination,
    InvalidGeometry,
    RegionOutOfBounds,
    ContextGone,
    IoFailure,
    EncodeFailure,
}

impl CropError {
    pub fn kind(&self) -> CropErrorKind {
        match self {
            CropError::MissingSource(_) => CropErrorKind::MissingSource,
            CropError::EmptyRegion(_) => CropErrorKind::EmptyRegion,
            CropError::MissingDestination(_) => CropErrorKind::MissingDestination,
            CropError::InvalidGeometry(_) => CropErrorKind::InvalidGeometry,
            CropError::RegionOutOfBounds { .. } => CropErrorKind::RegionOutOfBounds,
            CropError::ContextGone(_) => CropErrorKind::ContextGone,
            CropError::IoFailure { .. } => CropErrorKind::IoFailure,
            CropError::EncodeFailure(_) => CropErrorKind::EncodeFailure,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        CropError::IoFailure {
            context: context.into(),
            source,
        }
    }
}

impl From<DecodeError> for CropError {
    fn from(err: DecodeError) -> Self {
        CropError::MissingSource(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_matches_variant() {
        let err = CropError::ContextGone("host released".to_string());
        assert_eq!(err.kind(), CropErrorKind::ContextGone);

        let err = CropError::from(GeometryError::InvalidValue {
            what: "scale",
            value: 0.0,
        });
        assert_eq!(err.kind(), CropErrorKind::InvalidGeometry);
    }

    #[test]
    fn test_io_failure_keeps_source() {
        let err = CropError::io(
            "writing output",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );
        assert_eq!(err.kind(), CropErrorKind::IoFailure);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("writing output"));
    }

    #[test]
    fn test_out_of_bounds_display() {
        let err = CropError::RegionOutOfBounds {
            x: 10,
            y: -1,
            width: 50,
            height: 50,
            bitmap_width: 40,
            bitmap_height: 40,
        };
        assert_eq!(
            err.to_string(),
            "Crop region 50x50+10+-1 is outside the 40x40 bitmap"
        );
    }

    #[test]
    fn test_decode_error_is_missing_source() {
        let err = CropError::from(DecodeError::InvalidFormat);
        assert_eq!(err.kind(), CropErrorKind::MissingSource);
    }
}
