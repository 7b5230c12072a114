//! # Pipeline Configuration
//!
//! Centralized settings for one pipeline run. Values come from environment
//! variables (after `.env` is loaded) and can be overridden from the command line.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Input file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Scraped product CSV
    pub products_path: PathBuf,
    /// Newline-delimited noise phrases stripped from ingredient text
    pub noise_phrases_path: Option<PathBuf>,
    /// Newline-delimited product keys with known incomplete ingredient lists
    pub exclusion_path: Option<PathBuf>,
    /// Feature configuration JSON; built-in groups when absent
    pub feature_config_path: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            products_path: PathBuf::from("data/skincare_products.csv"),
            noise_phrases_path: None,
            exclusion_path: None,
            feature_config_path: None,
        }
    }
}

impl InputConfig {
    /// Validate input configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.products_path.as_os_str().is_empty() {
            return Err(AppError::Config("Input CSV path cannot be empty".to_string()));
        }

        let optional_files = [
            ("noise phrase list", &self.noise_phrases_path),
            ("exclusion list", &self.exclusion_path),
            ("feature config", &self.feature_config_path),
        ];
        for (label, path) in optional_files {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "{} '{}' does not exist",
                        label,
                        path.display()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving every report
    pub dir: PathBuf,
    /// Whether to write the junction relation as its own CSV
    pub emit_junction: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            emit_junction: true,
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.dir.as_os_str().is_empty() {
            return Err(AppError::Config("Output directory cannot be empty".to_string()));
        }
        if self.dir.is_file() {
            return Err(AppError::Config(format!(
                "Output path '{}' is a file, not a directory",
                self.dir.display()
            )));
        }
        Ok(())
    }
}

/// Feature derivation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureOptions {
    /// Fraction of each ingredient list used for the top-portion feature
    pub top_percentile: Option<f64>,
    /// Lowest rating counted as top-rated in the ingredient summary
    pub min_top_rating: f64,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            top_percentile: None,
            min_top_rating: 4.0,
        }
    }
}

impl FeatureOptions {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(percentile) = self.top_percentile {
            if !(percentile > 0.0 && percentile <= 1.0) {
                return Err(AppError::Config(format!(
                    "Top percentile must be in (0, 1], got {}",
                    percentile
                )));
            }
        }

        if !(0.0..=5.0).contains(&self.min_top_rating) {
            return Err(AppError::Config(format!(
                "Minimum top rating must be between 0 and 5, got {}",
                self.min_top_rating
            )));
        }

        Ok(())
    }
}

/// Unified pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub features: FeatureOptions,
    /// Abort when a repeated key disagrees with its first observation
    pub strict_duplicates: bool,
    pub observability: ObservabilityConfig,
}

fn env_or<T: FromStr>(name: &str, default: &str) -> AppResult<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::Config(format!("{} has an invalid value", name)))
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(path) = env_path("INPUT_PATH") {
            config.input.products_path = path;
        }
        config.input.noise_phrases_path = env_path("NOISE_PHRASES_PATH");
        config.input.exclusion_path = env_path("EXCLUDED_KEYS_PATH");
        config.input.feature_config_path = env_path("FEATURE_CONFIG_PATH");

        if let Some(dir) = env_path("OUTPUT_DIR") {
            config.output.dir = dir;
        }
        config.output.emit_junction = env_or("EMIT_JUNCTION", "true")?;

        config.features.top_percentile = match env::var("TOP_PERCENTILE") {
            Ok(value) => Some(value.parse().map_err(|_| {
                AppError::Config("TOP_PERCENTILE must be a valid number".to_string())
            })?),
            Err(_) => None,
        };
        config.features.min_top_rating = env_or("MIN_TOP_RATING", "4.0")?;
        config.strict_duplicates = env_or("STRICT_DUPLICATES", "false")?;

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.input.validate()?;
        self.output.validate()?;
        self.features.validate()?;
        self.observability.validate().map_err(AppError::Config)?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: input={}, output_dir={}, emit_junction={}, top_percentile={:?}, strict_duplicates={}, metrics_export={}",
            self.input.products_path.display(),
            self.output.dir.display(),
            self.output.emit_junction,
            self.features.top_percentile,
            self.strict_duplicates,
            self.observability.enable_metrics_export
        )
    }
}
