//! Cropframe Core - crop geometry and crop pipeline
//!
//! This crate provides the model behind an interactive crop view and the
//! background job that turns the confirmed view into an output file:
//!
//! - [`geometry`]: rectangles, the image matrix and crop-window fitting
//! - [`state`]: the live transform the view mutates during gestures
//! - [`pipeline`]: downscale, rotate, extract, encode and persist a crop
//! - [`engine`]: runs crop requests on a caller-owned tokio runtime
//! - [`storage`]: the I/O capability handed to each request
//!
//! The library installs no tracing subscriber; hosts decide where the
//! `tracing` events go.

pub mod decode;
pub mod encode;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod transform;

pub use engine::{CropCallback, CropEngine, CropHandle, EngineConfig};
pub use error::{CropError, CropErrorKind, Result};
pub use geometry::{
    calculate_crop_rect, fit_image_to_crop, Affine, FitAdjustment, GeometryError, Point, Rect,
};
pub use model::{
    AspectRatio, CropParameters, CropResult, ExifInfo, ImageState, Location, OutputFormat,
};
pub use options::{ConfigError, CropOptions};
pub use pipeline::{crop_image, CropRequest};
pub use state::{GestureFlags, TransformState};
pub use storage::{FsStorage, MemoryStorage, Storage};
