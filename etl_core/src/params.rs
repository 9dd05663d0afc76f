//! Read-through parameter store backed by the control database.
//!
//! Parameters are deliberately not cached: every `get`/`set` opens its own
//! connection, performs its work, and closes it, so a control-store outage
//! affects only the call in flight and operators can change values between
//! stage runs without restarting anything. Every access, including failed
//! ones, leaves a row in `config_log`.

use chrono::Utc;
use diesel::prelude::*;
use tracing::warn;

use crate::{
    db::connect_sqlite,
    error::StageError,
    ledger::to_rfc3339_millis,
    models::NewConfigLogRow,
    schema::{config, config_log},
};

/// Handle on the `config` key/value table.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    database_url: String,
}

impl ParameterStore {
    /// A store handle for the control database at `database_url`.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Read a parameter. `Ok(None)` means the key does not exist; `Err` means
    /// the control store itself could not be reached.
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = connect_sqlite(&self.database_url)?;

        let lookup = config::table
            .filter(config::config_key.eq(key))
            .select(config::config_value)
            .first::<String>(&mut conn)
            .optional();

        match lookup {
            Ok(Some(value)) => {
                audit(&mut conn, "READ", key, None, Some(&value), None);
                Ok(Some(value))
            }
            Ok(None) => {
                audit(&mut conn, "READ_NOT_FOUND", key, None, None, Some("parameter not present"));
                Ok(None)
            }
            Err(e) => {
                audit(&mut conn, "READ_FAIL", key, None, None, Some(&e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Read a parameter, falling back to `default` when absent.
    pub fn get_or(&self, key: &str, default: &str) -> anyhow::Result<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Read a parameter that must exist; absence is a configuration error.
    pub fn require(&self, key: &str) -> Result<String, StageError> {
        self.get(key)
            .map_err(StageError::Ledger)?
            .ok_or_else(|| StageError::MissingParameter(key.to_string()))
    }

    /// Upsert a parameter, auditing the old→new transition. Returns `false`
    /// (after auditing the failure) instead of raising when the write fails.
    pub fn set(&self, key: &str, value: &str) -> bool {
        let mut conn = match connect_sqlite(&self.database_url) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(key, error = %e, "parameter update failed: control store unreachable");
                return false;
            }
        };

        let old_value = config::table
            .filter(config::config_key.eq(key))
            .select(config::config_value)
            .first::<String>(&mut conn)
            .optional()
            .unwrap_or(None);

        let written = diesel::insert_into(config::table)
            .values((config::config_key.eq(key), config::config_value.eq(value)))
            .on_conflict(config::config_key)
            .do_update()
            .set(config::config_value.eq(value))
            .execute(&mut conn);

        match written {
            Ok(_) => {
                audit(&mut conn, "UPDATE", key, old_value.as_deref(), Some(value), None);
                true
            }
            Err(e) => {
                warn!(key, error = %e, "parameter update failed");
                audit(
                    &mut conn,
                    "UPDATE_FAIL",
                    key,
                    old_value.as_deref(),
                    Some(value),
                    Some(&e.to_string()),
                );
                false
            }
        }
    }
}

/// Best-effort audit insert; a failed audit is logged, never raised.
fn audit(
    conn: &mut SqliteConnection,
    action: &str,
    key: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    message: Option<&str>,
) {
    let log_time = to_rfc3339_millis(Utc::now());
    let row = NewConfigLogRow {
        log_time: &log_time,
        action,
        param_key: key,
        old_value,
        new_value,
        message,
    };
    if let Err(e) = diesel::insert_into(config_log::table)
        .values(&row)
        .execute(conn)
    {
        warn!(action, key, error = %e, "config audit write failed");
    }
}
