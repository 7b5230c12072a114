//! # Observability Configuration
//!
//! Environment-specific settings for logging and the metrics snapshot.

use std::env;
use std::path::PathBuf;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for the pipeline crate
    pub log_level: String,
    /// Log format override: "json" or "pretty"
    pub log_format: Option<String>,
    /// Whether to install the Prometheus recorder
    pub enable_metrics_export: bool,
    /// Where to write the rendered metrics after a successful run
    pub metrics_output_path: Option<PathBuf>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: None,
            enable_metrics_export: false,
            metrics_output_path: None,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").ok(),
            enable_metrics_export: env::var("ENABLE_METRICS_EXPORT")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            metrics_output_path: env::var("METRICS_OUTPUT_PATH").ok().map(PathBuf::from),
        }
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Pretty output in development or when asked for explicitly; JSON otherwise
    pub fn use_pretty_logs(&self) -> bool {
        match self.log_format.as_deref() {
            Some("pretty") => true,
            Some(_) => false,
            None => self.is_development(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!("Invalid log level: {}", self.log_level));
        }

        if let Some(format) = &self.log_format {
            if format != "json" && format != "pretty" {
                return Err(format!("Invalid log format: {}", format));
            }
        }

        if self.metrics_output_path.is_some() && !self.enable_metrics_export {
            return Err(
                "METRICS_OUTPUT_PATH is set but ENABLE_METRICS_EXPORT is false".to_string(),
            );
        }

        Ok(())
    }
}

/// Environment-specific configuration presets
pub mod presets {
    use super::ObservabilityConfig;

    /// Development configuration with verbose pretty logs
    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Production configuration: JSON logs and a metrics snapshot
    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "production".to_string(),
            log_level: "info".to_string(),
            enable_metrics_export: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.log_level, "info");
        assert!(!config.enable_metrics_export);
        assert!(config.metrics_output_path.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ObservabilityConfig::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        // Invalid log level
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        // Reset and test invalid log format
        config.log_level = "WARN".to_string();
        config.log_format = Some("xml".to_string());
        assert!(config.validate().is_err());

        // Snapshot path without the recorder
        config.log_format = None;
        config.metrics_output_path = Some(PathBuf::from("metrics.prom"));
        assert!(config.validate().is_err());

        config.enable_metrics_export = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_environment_logs_pretty() {
        let config = ObservabilityConfig::default();
        assert!(config.use_pretty_logs());

        let json = ObservabilityConfig {
            log_format: Some("json".to_string()),
            ..Default::default()
        };
        assert!(!json.use_pretty_logs());
    }

    #[test]
    fn test_log_format_selection() {
        let dev = presets::development();
        assert!(dev.use_pretty_logs());

        let mut prod = presets::production();
        assert!(!prod.use_pretty_logs());
        prod.log_format = Some("pretty".to_string());
        assert!(prod.use_pretty_logs());
    }

    #[test]
    fn test_environment_detection() {
        let dev = presets::development();
        assert!(dev.is_development());
        assert!(!dev.is_production());

        let prod = presets::production();
        assert!(!prod.is_development());
        assert!(prod.is_production());
        assert!(prod.enable_metrics_export);
    }
}
