//! Output encoding: quality-controlled JPEG, PNG and lossless WebP.
//!
//! All operations are synchronous and run on the crop worker.

mod codec;

pub use codec::{encode_bitmap, EncodeError};
