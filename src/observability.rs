use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total commands executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "castellan_queries_total";

/// Histogram: command latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "castellan_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "castellan_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "castellan_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "castellan_connections_rejected_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "castellan_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "castellan_wal_flush_batch_size";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: reservations advanced by the sweep. Labels: to.
pub const SWEEP_TRANSITIONS_TOTAL: &str = "castellan_sweep_transitions_total";

/// Counter: loyalty vouchers issued.
pub const VOUCHERS_ISSUED_TOTAL: &str = "castellan_vouchers_issued_total";

/// Install the Prometheus metrics exporter on the given port. No-op if the
/// port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertItem { .. } => "insert_item",
        Command::UpdateItem { .. } => "update_item",
        Command::InsertPromo { .. } => "insert_promo",
        Command::UpdatePromo { .. } => "update_promo",
        Command::InsertReservation { .. } => "insert_reservation",
        Command::TransitionReservation { .. } => "transition_reservation",
        Command::MarkReservationPaid { .. } => "mark_reservation_paid",
        Command::CancelReservation { .. } => "cancel_reservation",
        Command::SelectItems { .. } => "select_items",
        Command::SelectReservations { .. } => "select_reservations",
        Command::SelectQuote { .. } => "select_quote",
        Command::SelectAvailability { .. } => "select_availability",
        Command::SelectDiscount { .. } => "select_discount",
        Command::SelectLoyalty { .. } => "select_loyalty",
        Command::SelectVouchers { .. } => "select_vouchers",
    }
}
