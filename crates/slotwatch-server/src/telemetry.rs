//! Metric descriptions, recording helpers and the Prometheus exporter.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder with [`install_exporter`].

use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::error::{ServerError, ServerResult};

/// Installs the Prometheus recorder and serves `/metrics` on `listen`.
///
/// Only one recorder can be installed per process. Must be called from
/// within a Tokio runtime.
pub fn install_exporter(listen: SocketAddr) -> ServerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .map_err(|e| ServerError::config(format!("failed to install Prometheus exporter on {listen}: {e}")))?;
    info!(%listen, "prometheus exporter listening");
    Ok(())
}

/// Registers metric descriptions. Call once, after a recorder is installed.
pub fn register_metrics() {
    describe_histogram!(
        "slotwatch_tick_duration_seconds",
        "Wall time of one discovery tick"
    );
    describe_counter!("slotwatch_ticks_total", "Discovery ticks run");
    describe_counter!("slotwatch_slot_checks_total", "Timeslots checked against the store");
    describe_counter!("slotwatch_new_slots_total", "Slots seen for the first time");
    describe_counter!(
        "slotwatch_notifications_sent_total",
        "Notifications delivered to a subscriber"
    );
    describe_counter!(
        "slotwatch_delivery_failures_total",
        "Notifications that failed to reach a subscriber"
    );
    describe_counter!("slotwatch_errors_total", "Errors by stage and kind");
    describe_gauge!("slotwatch_active_subscribers", "Current number of subscribers");
    describe_gauge!("slotwatch_seen_slots_total", "Records held by the seen-slot store");
}

/// Records the outcome of a completed tick.
pub fn record_tick(elapsed_secs: f64, checks: usize, new_slots: usize) {
    metrics::histogram!("slotwatch_tick_duration_seconds").record(elapsed_secs);
    metrics::counter!("slotwatch_ticks_total").increment(1);
    metrics::counter!("slotwatch_slot_checks_total").increment(checks as u64);
    metrics::counter!("slotwatch_new_slots_total").increment(new_slots as u64);
}

/// Records one delivered notification.
pub fn record_notification_sent() {
    metrics::counter!("slotwatch_notifications_sent_total").increment(1);
}

/// Records one failed delivery.
pub fn record_delivery_failure() {
    metrics::counter!("slotwatch_delivery_failures_total").increment(1);
}

/// Records an error raised at `stage` (e.g. `staff`, `store`).
pub fn record_error(stage: &'static str, kind: &'static str) {
    metrics::counter!("slotwatch_errors_total", "stage" => stage, "kind" => kind).increment(1);
}

/// Sets the number of subscribers.
pub fn set_active_subscribers(count: usize) {
    metrics::gauge!("slotwatch_active_subscribers").set(count as f64);
}

/// Sets the number of seen-slot records.
pub fn set_seen_slots(count: usize) {
    metrics::gauge!("slotwatch_seen_slots_total").set(count as f64);
}
