//! Bitmap loading and resampling.
//!
//! This module provides functionality for:
//! - Decoding JPEG, PNG and WebP sources into an RGBA working bitmap
//! - Reading the EXIF orientation and baking it into the pixels
//! - Resizing bitmaps for the downscale step of a crop
//!
//! All operations are synchronous; the crop engine calls them from a
//! blocking worker.

mod load;
mod resize;
mod types;

pub use load::{load_bitmap, load_bitmap_no_orientation, read_orientation};
pub use resize::{resize, scale_bitmap, scaled_dimensions};
pub use types::{Bitmap, DecodeError, FilterType, Orientation};
