//! Immutable inputs to a crop request.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decode::Orientation;

/// Encoding used for the cropped output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    /// Lossless WebP.
    WebP,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// Whether EXIF metadata is carried over to this format.
    pub fn carries_exif(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

/// Where a source is read from or an output is written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// A path on the local filesystem.
    File(PathBuf),
    /// An opaque content URI resolved by the host's storage.
    Content(String),
}

impl Location {
    /// Location of a local file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Location::File(path.into())
    }

    /// The filesystem path, if this is a file location.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Location::File(path) => Some(path),
            Location::Content(_) => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Content(uri) => f.write_str(uri),
        }
    }
}

/// Orientation facts captured when the source was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifInfo {
    pub orientation: Orientation,
    /// Clockwise rotation implied by the orientation: 0, 90, 180 or 270.
    pub degrees: u16,
    /// `-1` for mirrored orientations, otherwise `1`.
    pub translation: i8,
}

impl Default for ExifInfo {
    fn default() -> Self {
        Self::new(Orientation::Normal)
    }
}

impl ExifInfo {
    /// Derive rotation and mirroring from an EXIF orientation.
    pub fn new(orientation: Orientation) -> Self {
        let degrees = match orientation {
            Orientation::Rotate90CW | Orientation::Transpose => 90,
            Orientation::Rotate180 | Orientation::FlipVertical => 180,
            Orientation::Rotate270CW | Orientation::Transverse => 270,
            Orientation::Normal | Orientation::FlipHorizontal => 0,
        };
        let translation = if orientation.is_mirrored() { -1 } else { 1 };
        Self {
            orientation,
            degrees,
            translation,
        }
    }

    /// Build from a raw EXIF tag value; out-of-range values read as normal.
    pub fn from_tag(value: u32) -> Self {
        Self::new(Orientation::from(value))
    }
}

/// Output constraints and locations for one crop request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropParameters {
    /// Maximum output width; `0` with `max_result_height == 0` means unconstrained.
    pub max_result_width: u32,
    pub max_result_height: u32,
    pub output_format: OutputFormat,
    /// Encoder quality, 0 to 100. Only JPEG uses it.
    pub output_quality: u8,
    pub input_location: Location,
    pub output_location: Option<Location>,
    pub exif_info: ExifInfo,
}

impl CropParameters {
    /// Parameters with JPEG output at quality 90 and no size limit.
    pub fn new(input_location: Location, output_location: Option<Location>) -> Self {
        Self {
            max_result_width: 0,
            max_result_height: 0,
            output_format: OutputFormat::default(),
            output_quality: 90,
            input_location,
            output_location,
            exif_info: ExifInfo::default(),
        }
    }

    /// Limit the output to `width x height`; zero on either side disables the limit.
    pub fn with_max_result_size(mut self, width: u32, height: u32) -> Self {
        self.max_result_width = width;
        self.max_result_height = height;
        self
    }

    /// Set the output format; quality is capped at 100.
    pub fn with_format(mut self, format: OutputFormat, quality: u8) -> Self {
        self.output_format = format;
        self.output_quality = quality.min(100);
        self
    }

    /// Attach the orientation captured at load time.
    pub fn with_exif_info(mut self, exif_info: ExifInfo) -> Self {
        self.exif_info = exif_info;
        self
    }

    /// True when both maximum output dimensions are set.
    pub fn has_max_size(&self) -> bool {
        self.max_result_width > 0 && self.max_result_height > 0
    }
}
