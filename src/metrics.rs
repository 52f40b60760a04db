use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!("estimates_total", "Total number of estimate requests by outcome");
    describe_histogram!(
        "estimate_duration_seconds",
        "End-to-end estimate duration in seconds"
    );
    describe_counter!(
        "photo_fallback_total",
        "Photo lookups by the year tier that produced the result"
    );
    describe_counter!("photo_probes_total", "Photo reachability probes by result");
    describe_gauge!("street_smarts_info", "Service version information");

    gauge!("street_smarts_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a finished estimate
pub fn record_estimate(outcome: &str, duration: Duration) {
    counter!("estimates_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("estimate_duration_seconds").record(duration.as_secs_f64());
}

/// Record which tier produced the photos
pub fn record_photo_tier(tier: &str) {
    counter!("photo_fallback_total", "tier" => tier.to_string()).increment(1);
}

/// Record a single reachability probe
pub fn record_photo_probe(reachable: bool) {
    let result = if reachable { "ok" } else { "failed" };
    counter!("photo_probes_total", "result" => result).increment(1);
}
