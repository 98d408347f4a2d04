//! Metrics initialization for Prometheus exporter.

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;
use crate::error::{Error, Result};

/// Frames delivered by the capture handle.
pub const FRAMES_CAPTURED: &str = "reflector_frames_captured_total";
/// Frames dropped by the decode pipeline because no Ethernet layer parsed.
pub const FRAMES_SKIPPED: &str = "reflector_frames_skipped_total";
/// Queries re-injected on the interface.
pub const QUERIES_REFLECTED: &str = "reflector_queries_reflected_total";
/// Classified records that were not queries.
pub const NON_QUERIES_DROPPED: &str = "reflector_non_queries_dropped_total";
/// Reflection attempts that failed to serialize or write.
pub const REFLECTION_FAILURES: &str = "reflector_reflection_failures_total";

/// Initialize the metrics system based on configuration.
///
/// When metrics are enabled, this starts an HTTP server that exposes
/// a `/metrics` endpoint for Prometheus to scrape.
///
/// When metrics are disabled, this is a no-op. The `metrics` crate
/// handles unregistered metrics gracefully (they become no-ops).
pub fn init(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()
        .map_err(|err| Error::Metrics(err.to_string()))?;

    Ok(())
}
