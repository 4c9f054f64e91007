use chrono::NaiveDate;

pub mod auth;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod reaper;
pub mod sql;
pub mod tls;
pub mod wal;
pub mod wire;

/// The single source of "today" on the serving path: the server's local
/// calendar date. Engine operations take the date explicitly, so the wire
/// layer and the sweep read it here while tests pin their own dates.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
