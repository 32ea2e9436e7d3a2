//! Pixel operations of the crop pipeline: rotation and region extraction.
//!
//! # Coordinate System
//!
//! - Rotation angles are in degrees, positive = clockwise on screen
//! - Regions are whole pixels in the working bitmap
//! - Origin is the top-left corner

mod crop;
mod rotation;

pub use crop::extract_region;
pub use rotation::{compute_rotated_bounds, rotate_bitmap};
