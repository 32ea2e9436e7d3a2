//! Crop options loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock configuration:
//!
//! ```toml
//! output_format = "jpeg"
//! quality = 90
//! max_result_width = 0
//! max_result_height = 0
//! default_aspect_ratio = 2
//! max_scale_multiplier = 10.0
//!
//! [gestures]
//! scale = true
//! rotate = true
//!
//! [engine]
//! worker_threads = 1
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineConfig;
use crate::model::{
    AspectRatio, CropParameters, ExifInfo, Location, OutputFormat, DEFAULT_ASPECT_RATIO_INDEX,
};
use crate::state::{GestureFlags, DEFAULT_MAX_SCALE_MULTIPLIER};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid options: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropOptions {
    pub output_format: OutputFormat,
    /// JPEG quality, 0 to 100.
    pub quality: u8,
    pub max_result_width: u32,
    pub max_result_height: u32,
    pub aspect_ratios: Vec<AspectRatio>,
    /// Index into `aspect_ratios` selected when the view opens.
    pub default_aspect_ratio: usize,
    pub gestures: GestureFlags,
    pub max_scale_multiplier: f64,
    pub engine: EngineConfig,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            quality: 90,
            max_result_width: 0,
            max_result_height: 0,
            aspect_ratios: AspectRatio::defaults(),
            default_aspect_ratio: DEFAULT_ASPECT_RATIO_INDEX,
            gestures: GestureFlags::default(),
            max_scale_multiplier: DEFAULT_MAX_SCALE_MULTIPLIER,
            engine: EngineConfig::default(),
        }
    }
}

impl CropOptions {
    /// Parse and validate options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Read and validate an options file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values no crop could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "quality must be at most 100, got {}",
                self.quality
            )));
        }
        if self.aspect_ratios.is_empty() {
            return Err(ConfigError::Invalid("aspect_ratios is empty".to_string()));
        }
        if self.default_aspect_ratio >= self.aspect_ratios.len() {
            return Err(ConfigError::Invalid(format!(
                "default_aspect_ratio {} is out of range for {} ratios",
                self.default_aspect_ratio,
                self.aspect_ratios.len()
            )));
        }
        for ratio in &self.aspect_ratios {
            ratio
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("aspect ratio {}: {}", ratio.title(), e)))?;
        }
        if !(self.max_scale_multiplier.is_finite() && self.max_scale_multiplier >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "max_scale_multiplier must be at least 1, got {}",
                self.max_scale_multiplier
            )));
        }
        if self.engine.worker_threads == 0 {
            return Err(ConfigError::Invalid("engine.worker_threads must be positive".to_string()));
        }
        Ok(())
    }

    /// The ratio selected when the view opens.
    pub fn selected_aspect_ratio(&self) -> Option<&AspectRatio> {
        self.aspect_ratios.get(self.default_aspect_ratio)
    }

    /// Request parameters carrying these options' output settings.
    pub fn crop_parameters(
        &self,
        input: Location,
        output: Option<Location>,
        exif_info: ExifInfo,
    ) -> CropParameters {
        CropParameters::new(input, output)
            .with_format(self.output_format, self.quality)
            .with_max_result_size(self.max_result_width, self.max_result_height)
            .with_exif_info(exif_info)
    }
}
