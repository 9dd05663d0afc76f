//! Row structs for the control-store tables.
//!
//! All structs are Diesel-compatible (Queryable/Insertable/Selectable) for
//! SQLite. Timestamps are RFC-3339 UTC strings; `run_date` is `YYYY-MM-DD`.

use diesel::prelude::*;

use crate::schema::{config, config_log, process_log};

/// A pipeline parameter in [`crate::schema::config`].
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = config)]
pub struct ConfigRow {
    /// Parameter key, e.g. `STAGING_DIR`.
    pub config_key: String,
    /// Parameter value as stored.
    pub config_value: String,
}

/// Insertable parameter row.
#[derive(Debug, Insertable)]
#[diesel(table_name = config)]
pub struct NewConfigRow<'a> {
    /// Parameter key.
    pub config_key: &'a str,
    /// Parameter value.
    pub config_value: &'a str,
}

/// One audited parameter access in [`crate::schema::config_log`].
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = config_log)]
pub struct ConfigLogRow {
    /// Row id (assigned by SQLite).
    pub id: Option<i32>,
    /// When the access happened (RFC-3339 UTC).
    pub log_time: String,
    /// What happened: `READ`, `READ_NOT_FOUND`, `READ_FAIL`, `UPDATE`, `UPDATE_FAIL`.
    pub action: String,
    /// The parameter key touched.
    pub param_key: String,
    /// Prior value, for updates.
    pub old_value: Option<String>,
    /// New/observed value.
    pub new_value: Option<String>,
    /// Free-text detail.
    pub message: Option<String>,
}

/// Insertable audit row.
#[derive(Debug, Insertable)]
#[diesel(table_name = config_log)]
pub struct NewConfigLogRow<'a> {
    /// When the access happened (RFC-3339 UTC).
    pub log_time: &'a str,
    /// Audit action tag.
    pub action: &'a str,
    /// The parameter key touched.
    pub param_key: &'a str,
    /// Prior value, for updates.
    pub old_value: Option<&'a str>,
    /// New/observed value.
    pub new_value: Option<&'a str>,
    /// Free-text detail.
    pub message: Option<&'a str>,
}

/// One stage-run attempt in [`crate::schema::process_log`].
///
/// Rows are append-only; the current status of a (process, date) key is the
/// row with the highest id for that key.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = process_log)]
pub struct ProcessLogRow {
    /// Row id (assigned by SQLite).
    pub id: Option<i32>,
    /// Run-config identifier of the stage.
    pub process_id: i32,
    /// Ledger key: the stage's process name.
    pub process_name: String,
    /// Ledger key: the log date (`YYYY-MM-DD`).
    pub run_date: String,
    /// Attempt start (RFC-3339 UTC).
    pub start_time: String,
    /// Attempt end; null while running.
    pub end_time: Option<String>,
    /// Status code from the stage's vocabulary.
    pub status: String,
    /// Rows pulled from the source, when the stage extracts.
    pub records_extracted: Option<i64>,
    /// Rows written to the target store, when the stage loads.
    pub records_loaded: Option<i64>,
    /// Rows produced by a transform, when the stage transforms.
    pub records_transformed: Option<i64>,
    /// Human-readable summary or captured failure detail.
    pub message: Option<String>,
}

/// Insertable process-log row.
#[derive(Debug, Insertable)]
#[diesel(table_name = process_log)]
pub struct NewProcessLogRow<'a> {
    /// Run-config identifier of the stage.
    pub process_id: i32,
    /// Ledger key: the stage's process name.
    pub process_name: &'a str,
    /// Ledger key: the log date (`YYYY-MM-DD`).
    pub run_date: &'a str,
    /// Attempt start (RFC-3339 UTC).
    pub start_time: &'a str,
    /// Attempt end; null while running.
    pub end_time: Option<&'a str>,
    /// Status code from the stage's vocabulary.
    pub status: &'a str,
    /// Rows pulled from the source.
    pub records_extracted: Option<i64>,
    /// Rows written to the target store.
    pub records_loaded: Option<i64>,
    /// Rows produced by a transform.
    pub records_transformed: Option<i64>,
    /// Summary or failure detail (truncated by the ledger).
    pub message: Option<&'a str>,
}
