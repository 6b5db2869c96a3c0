use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus HTTP exporter on the given port.
/// After this call, any metrics recorded via the `metrics` crate
/// macros (counter!, histogram!) are automatically exported at /metrics.
pub fn init_metrics_server(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;
    Ok(())
}

// ── Snapshot metrics ─────────────────────────────────────────────

pub fn record_fetch_attempt(outcome: &'static str) {
    counter!("snapshot_fetch_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_fetch_latency(latency_ms: f64) {
    histogram!("snapshot_fetch_latency_ms").record(latency_ms);
}

pub fn record_snapshot_records_dropped(count: u64) {
    counter!("snapshot_records_dropped_total").increment(count);
}

// ── Stream metrics ───────────────────────────────────────────────

pub fn record_connect(outcome: &'static str) {
    counter!("stream_connects_total", "outcome" => outcome).increment(1);
}

/// `kind` is one of: ticker, ignored, malformed.
pub fn record_stream_message(kind: &'static str) {
    counter!("stream_messages_total", "kind" => kind).increment(1);
}

pub fn record_ticker_update(outcome: &'static str) {
    counter!("ticker_updates_total", "outcome" => outcome).increment(1);
}
