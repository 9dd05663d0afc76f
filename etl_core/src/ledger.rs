//! The append-only process ledger.
//!
//! Every significant stage transition appends one row to `process_log`;
//! nothing is ever updated in place. "Current status" of a (process, date)
//! key is defined as the status of the most recent row for that key, which is
//! what [`ProcessLog::latest_status`] returns. Appends run inside a single
//! immediate transaction so a partially-written row (counts without status,
//! say) is never visible to readers.
//!
//! Lookup is by exact date only; the "try today, fall back to the target
//! date" policy belongs to the stage runner, not to this component.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::{
    db::connect_sqlite,
    dates::ymd,
    models::NewProcessLogRow,
    schema::process_log,
};

/// Upper bound on stored message length, in characters.
pub const MESSAGE_MAX_LEN: usize = 255;

/// The three observability counters a stage can report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    /// Rows pulled from the source.
    pub extracted: Option<i64>,
    /// Rows written to the target store.
    pub loaded: Option<i64>,
    /// Rows produced by a transform.
    pub transformed: Option<i64>,
}

impl RowCounts {
    /// No counters reported.
    pub fn none() -> Self {
        Self::default()
    }

    /// All three counters explicitly zero, as written for skip entries.
    pub fn zero() -> Self {
        Self {
            extracted: Some(0),
            loaded: Some(0),
            transformed: Some(0),
        }
    }
}

/// One transition to append.
#[derive(Debug)]
pub struct LogEntry<'a> {
    /// Run-config identifier of the stage.
    pub process_id: i32,
    /// Ledger key: the stage's process name.
    pub process_name: &'a str,
    /// Ledger key: the log date.
    pub run_date: NaiveDate,
    /// Attempt start.
    pub start_time: DateTime<Utc>,
    /// Attempt end; `None` for running markers.
    pub end_time: Option<DateTime<Utc>>,
    /// Status code from the stage's vocabulary.
    pub status: &'a str,
    /// Reported counters.
    pub counts: RowCounts,
    /// Summary or failure detail; truncated to [`MESSAGE_MAX_LEN`] on write.
    pub message: Option<String>,
}

/// Handle on the process ledger. Opens a fresh connection per call.
#[derive(Debug, Clone)]
pub struct ProcessLog {
    database_url: String,
}

impl ProcessLog {
    /// A ledger handle for the control store at `database_url`.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Append one transition row atomically.
    pub fn append(&self, entry: &LogEntry<'_>) -> anyhow::Result<()> {
        let mut conn = connect_sqlite(&self.database_url)?;

        let run_date = ymd(entry.run_date);
        let start_time = to_rfc3339_millis(entry.start_time);
        let end_time = entry.end_time.map(to_rfc3339_millis);
        let message = entry.message.as_deref().map(truncate_message);

        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            diesel::insert_into(process_log::table)
                .values(&NewProcessLogRow {
                    process_id: entry.process_id,
                    process_name: entry.process_name,
                    run_date: &run_date,
                    start_time: &start_time,
                    end_time: end_time.as_deref(),
                    status: entry.status,
                    records_extracted: entry.counts.extracted,
                    records_loaded: entry.counts.loaded,
                    records_transformed: entry.counts.transformed,
                    message: message.as_deref(),
                })
                .execute(conn)?;
            Ok(())
        })?;
        Ok(())
    }

    /// Status of the most recent row for `(process_name, date)`, if any.
    pub fn latest_status(
        &self,
        process_name: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Option<String>> {
        use crate::schema::process_log::dsl as pl;

        let mut conn = connect_sqlite(&self.database_url)?;
        let found = pl::process_log
            .filter(pl::process_name.eq(process_name))
            .filter(pl::run_date.eq(ymd(date)))
            .order(pl::id.desc())
            .select(pl::status)
            .first::<String>(&mut conn)
            .optional()?;
        Ok(found)
    }
}

/// Format a UTC timestamp as RFC-3339 with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Clamp a message to [`MESSAGE_MAX_LEN`] characters (char-boundary safe).
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MESSAGE_MAX_LEN {
        message.to_string()
    } else {
        message.chars().take(MESSAGE_MAX_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_char_boundary_safe() {
        let long: String = "á".repeat(MESSAGE_MAX_LEN + 40);
        let clamped = truncate_message(&long);
        assert_eq!(clamped.chars().count(), MESSAGE_MAX_LEN);
    }

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(truncate_message("ok"), "ok");
    }
}
