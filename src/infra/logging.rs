//! Diagnostics go to stderr; stdout belongs to the stdio MCP channel.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info";

/// Directives from `RUST_LOG`, or `info` when unset or unparsable.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init() {
    let directives = std::env::var("RUST_LOG").ok();
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter_from(directives.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::trace!("subscriber already installed");
    }
}

/// Record one capability latency sample in the metrics registry and echo it
/// as a debug event, so the number is visible without an exporter.
pub fn record_latency(group: &'static str, tool: &str, elapsed: Duration) {
    let ms = elapsed.as_secs_f64() * 1_000.0;
    metrics::histogram!("pylon_capability_latency_ms", "capability" => group).record(ms);
    tracing::debug!(tool, latency_ms = ms, "latency sample");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directives_fall_back_to_info() {
        assert_eq!(filter_from(None).to_string(), "info");
        assert_eq!(filter_from(Some("pylon=loud")).to_string(), "info");
        assert_eq!(filter_from(Some("debug")).to_string(), "debug");
    }

    #[test]
    fn init_twice_and_record_without_exporter() {
        init();
        init();
        record_latency("qr_code", "pylon_qr_code", Duration::from_millis(3));
    }
}
