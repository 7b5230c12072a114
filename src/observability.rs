//! Observability setup for the ingredient pipeline.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Stage spans for the pipeline
//! - Metrics recording and an optional Prometheus text snapshot

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;

use crate::deduplication::DeduplicationStats;
use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;

/// Initialize logging and, when enabled, the metrics recorder
pub fn init_observability(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    init_tracing_with_config(config)?;

    let handle = if config.enable_metrics_export {
        Some(init_metrics_with_config(config)?)
    } else {
        None
    };

    tracing::info!(
        environment = %config.environment,
        metrics_enabled = %config.enable_metrics_export,
        "Observability initialized"
    );
    Ok(handle)
}

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("skincare_ingredients={}", config.log_level.to_lowercase()).parse()?);

    if config.use_pretty_logs() {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        // JSON formatting for production (default)
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Install the Prometheus recorder; metrics are rendered on demand, never served
fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!(
        snapshot_path = ?config.metrics_output_path,
        "Metrics collection initialized"
    );
    Ok(handle)
}

/// Write the rendered metrics to a file
pub fn write_metrics_snapshot(handle: &PrometheusHandle, path: &Path) -> AppResult<()> {
    fs::write(path, handle.render()).map_err(|e| {
        AppError::FileSystem(format!(
            "failed to write metrics snapshot '{}': {}",
            path.display(),
            e
        ))
    })?;
    tracing::info!(path = %path.display(), "Wrote metrics snapshot");
    Ok(())
}

/// Create a span for one pipeline stage
pub fn stage_span(stage: &str) -> tracing::Span {
    tracing::info_span!("pipeline_stage", stage = stage, component = "pipeline")
}

/// Record stage timing
pub fn record_stage_duration(stage: &str, duration: Duration) {
    let stage = stage.to_string();
    metrics::histogram!("stage_duration_seconds", "stage" => stage).record(duration.as_secs_f64());
}

/// Record how many observations were read
pub fn record_ingest_metrics(observations: usize) {
    metrics::counter!("products_ingested_total").increment(observations as u64);
}

/// Record deduplication results
pub fn record_deduplication_metrics(stats: &DeduplicationStats) {
    metrics::counter!("products_canonical_total").increment(stats.canonical_products as u64);
    let repeated = stats.total_observations - stats.canonical_products;
    metrics::counter!("duplicate_observations_total").increment(repeated as u64);
}

/// Record junction relation size
pub fn record_junction_metrics(rows: usize) {
    metrics::counter!("junction_rows_total").increment(rows as u64);
}

/// Record a tally of non-fatal data issues
pub fn record_data_issue_metrics(kind: &str, count: usize) {
    let kind = kind.to_string();
    metrics::counter!("data_issues_total", "kind" => kind).increment(count as u64);
}

/// Record a fatal error
pub fn record_error_metrics(error_type: &str, component: &str) {
    let error_type = error_type.to_string();
    let component = component.to_string();
    metrics::counter!("errors_total", "type" => error_type, "component" => component).increment(1);
}
