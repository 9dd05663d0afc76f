//! Dependency-gated batch ETL pipeline core.
//!
//! Six stages (crawl → load_staging → transform → load_warehouse →
//! insert_aggregate → load_datamart) share one orchestration protocol: check
//! the upstream stage's ledger status for the run date, check the stage's own
//! status (idempotency), do the work, append a terminal status row, and fire a
//! best-effort notification. [`runner::StageRunner`] implements that protocol
//! once; the per-stage differences (status vocabulary, whether a running
//! marker is written, which upstream to gate on) live in the
//! [`status::StageSpec`] table, and the per-stage work units implement
//! [`stages::StageBody`].

#![deny(missing_docs)]

pub mod config;
pub mod database;
pub mod dates;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod params;
pub mod runner;
pub mod schema;
pub mod stages;
pub mod status;
