use metrics::{counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Only one global recorder can exist per process. When one is already
/// installed (integration tests build many apps) a detached handle is
/// returned instead.
pub fn init_metrics() -> PrometheusHandle {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::debug!(error = %e, "Prometheus recorder already installed, using detached handle");
            return PrometheusBuilder::new().build_recorder().handle();
        }
    };

    register_metrics();
    handle
}

/// Pre-register counters so they appear even before the first increment.
/// The latency histogram is only described; it gets series on first record.
fn register_metrics() {
    counter!("liquidation_simulations_total").absolute(0);
    counter!("liquidation_executions_total", "outcome" => "executed").absolute(0);
    counter!("liquidation_executions_total", "outcome" => "skipped").absolute(0);
    counter!("price_lookup_failures_total").absolute(0);
    counter!("risk_snapshots_total").absolute(0);
    counter!("blocks_indexed_total").absolute(0);
    counter!("rate_limited_requests_total").absolute(0);

    describe_histogram!(
        "pipeline_latency_seconds",
        Unit::Seconds,
        "Latency of pipeline operations"
    );
}
