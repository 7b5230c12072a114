//! # Application Error Types
//!
//! This module defines the fatal error types used throughout the ingredient pipeline.
//! Recoverable data-quality findings are not errors; they are collected as
//! [`crate::audit::DataIssue`] values instead.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Malformed input data (unparseable numbers, missing columns, corrupt duplicates)
    Data(String),
    /// CSV reading or writing errors
    Csv(String),
    /// File system errors
    FileSystem(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Data(msg) => write!(f, "[DATA] {}", msg),
            AppError::Csv(msg) => write!(f, "[CSV] {}", msg),
            AppError::FileSystem(msg) => write!(f, "[FILESYSTEM] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Data(_) => "data",
            AppError::Csv(_) => "csv",
            AppError::FileSystem(_) => "filesystem",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        // Deserialization failures are bad input, not I/O trouble
        match err.kind() {
            csv::ErrorKind::Deserialize { .. } => AppError::Data(err.to_string()),
            _ => AppError::Csv(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(format!("invalid JSON: {}", err))
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Config(format!("invalid pattern: {}", err))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the pipeline
pub mod error_logging {
    use tracing::error;

    /// Log a fatal pipeline error with the stage it aborted
    pub fn log_pipeline_error(error: &super::AppError, stage: &str, input: Option<&str>) {
        crate::observability::record_error_metrics(error.kind(), stage);
        error!(
            error = %error,
            error_kind = %error.kind(),
            stage = %stage,
            input = ?input,
            "Pipeline aborted; no output was written"
        );
    }

    /// Log file system errors with path and operation context
    pub fn log_filesystem_error(
        error: &impl std::fmt::Display,
        operation: &str,
        path: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            "File system operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            AppError::Config("bad".to_string()).to_string(),
            "[CONFIG] bad"
        );
        assert_eq!(AppError::Data("x".to_string()).to_string(), "[DATA] x");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: AppError = io.into();
        assert_eq!(err.kind(), "filesystem");
    }
}
