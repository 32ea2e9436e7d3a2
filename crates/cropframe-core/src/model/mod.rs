//! Value types that travel between the live view and the crop engine.

mod aspect;
mod params;
mod snapshot;

pub use aspect::{AspectRatio, DEFAULT_ASPECT_RATIO_INDEX, SOURCE_IMAGE_ASPECT_RATIO};
pub use params::{CropParameters, ExifInfo, Location, OutputFormat};
pub use snapshot::{CropResult, ImageState};
