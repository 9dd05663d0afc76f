//! The external Database capability: bulk loads, scripted procedures, and
//! row-count verification against the staging/warehouse/datamart stores.
//!
//! The pipeline never trusts a procedure's own return signal; load and
//! transform effects are verified by independently counting affected rows,
//! so the trait exposes counting alongside the mutating operations.
//!
//! SQLite has no stored procedures; [`SqliteDatabase`] renders
//! `call_procedure(name, ...)` as executing the SQL script
//! `<procedures_dir>/<name>.sql` inside one transaction. Scripts may use the
//! `:run_date` and `:clean` placeholders, which are substituted with
//! internally-generated, validated values before execution; scripts must not
//! manage their own transactions. Every identifier that reaches SQL text
//! (table names, procedure names, CSV headers) is validated first, and all
//! row values travel as bound parameters.

use std::{fs, path::{Path, PathBuf}};

use chrono::NaiveDate;
use diesel::{
    Connection, RunQueryDsl, SqliteConnection,
    connection::SimpleConnection,
    sql_query,
    sql_types::{BigInt, Text},
    sqlite::Sqlite,
};
use thiserror::Error;
use tracing::debug;

use crate::{config::StoreConfig, dates::ymd};

/// Column used to scope fact-like rows to a run date.
pub const DATE_COLUMN: &str = "load_date";

/// Errors raised by the Database capability.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The store could not be opened.
    #[error("connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// A statement failed.
    #[error("query error: {0}")]
    Query(#[from] diesel::result::Error),

    /// `call_procedure` was asked for a script that is not installed.
    #[error("unknown procedure '{0}'")]
    UnknownProcedure(String),

    /// An identifier failed validation before reaching SQL text.
    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    /// Reading or writing a CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An exported row could not be rendered.
    #[error("export error: {0}")]
    Export(String),
}

/// Operations the stage bodies need from a SQL store.
///
/// Implementations open a fresh connection per call and release it on every
/// exit path; nothing is shared across invocations.
pub trait Database {
    /// Run the named procedure for `run_date`, with an optional clean flag.
    fn call_procedure(
        &mut self,
        name: &str,
        run_date: NaiveDate,
        clean: Option<bool>,
    ) -> Result<(), DatabaseError>;

    /// Load a headed CSV into `table` (columns taken from the header row),
    /// one transaction per file. Returns the number of rows inserted.
    fn bulk_load_csv(&mut self, table: &str, csv_path: &Path) -> Result<u64, DatabaseError>;

    /// Export `table` (optionally only rows whose [`DATE_COLUMN`] matches
    /// `date_filter`) to a headed CSV at `out_path`. Returns the row count.
    fn export_table_csv(
        &mut self,
        table: &str,
        date_filter: Option<NaiveDate>,
        out_path: &Path,
    ) -> Result<u64, DatabaseError>;

    /// Remove every row of `table`.
    fn truncate_table(&mut self, table: &str) -> Result<(), DatabaseError>;

    /// Remove the rows of `table` whose [`DATE_COLUMN`] matches `run_date`.
    /// Returns the number of rows removed.
    fn delete_rows_for_date(
        &mut self,
        table: &str,
        run_date: NaiveDate,
    ) -> Result<u64, DatabaseError>;

    /// Total row count of `table`.
    fn count_rows(&mut self, table: &str) -> Result<i64, DatabaseError>;

    /// Row count of `table` for `run_date`.
    fn count_rows_for_date(
        &mut self,
        table: &str,
        run_date: NaiveDate,
    ) -> Result<i64, DatabaseError>;
}

/// SQLite-backed implementation of [`Database`].
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    database_url: String,
    procedures_dir: Option<PathBuf>,
}

impl SqliteDatabase {
    /// A capability handle for `database_url`, with procedures resolved from
    /// `procedures_dir` when given.
    pub fn new(database_url: impl Into<String>, procedures_dir: Option<PathBuf>) -> Self {
        Self {
            database_url: database_url.into(),
            procedures_dir,
        }
    }

    /// A capability handle for a configured store.
    pub fn from_store(store: &StoreConfig) -> Self {
        Self::new(&store.database, store.procedures.clone())
    }

    fn connect(&self) -> Result<SqliteConnection, DatabaseError> {
        let mut conn = SqliteConnection::establish(&self.database_url)?;
        sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
        sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
        Ok(conn)
    }

    fn column_names(
        conn: &mut SqliteConnection,
        table: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        #[derive(diesel::QueryableByName)]
        struct ColumnInfo {
            #[diesel(sql_type = Text)]
            name: String,
        }

        let columns: Vec<ColumnInfo> =
            sql_query(format!("PRAGMA table_info({table})")).load(conn)?;
        let names: Vec<String> = columns.into_iter().map(|c| c.name).collect();
        for name in &names {
            validate_identifier(name)?;
        }
        Ok(names)
    }
}

#[derive(diesel::QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    n: i64,
}

#[derive(diesel::QueryableByName)]
struct JsonRow {
    #[diesel(sql_type = Text)]
    row_json: String,
}

impl Database for SqliteDatabase {
    fn call_procedure(
        &mut self,
        name: &str,
        run_date: NaiveDate,
        clean: Option<bool>,
    ) -> Result<(), DatabaseError> {
        validate_identifier(name)?;
        let dir = self
            .procedures_dir
            .as_ref()
            .ok_or_else(|| DatabaseError::UnknownProcedure(name.to_string()))?;
        let script_path = dir.join(format!("{name}.sql"));
        if !script_path.exists() {
            return Err(DatabaseError::UnknownProcedure(name.to_string()));
        }

        let mut script = fs::read_to_string(&script_path)?;
        script = script.replace(":run_date", &format!("'{}'", ymd(run_date)));
        if let Some(clean) = clean {
            script = script.replace(":clean", if clean { "1" } else { "0" });
        }

        debug!(procedure = name, date = %run_date, "executing procedure script");
        let mut conn = self.connect()?;
        conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
            conn.batch_execute(&script)?;
            Ok(())
        })
    }

    fn bulk_load_csv(&mut self, table: &str, csv_path: &Path) -> Result<u64, DatabaseError> {
        validate_identifier(table)?;

        let mut reader = csv::Reader::from_path(csv_path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(DatabaseError::Csv(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("no header row in {}", csv_path.display()),
            ))));
        }
        for header in &headers {
            validate_identifier(header)?;
        }

        let placeholders = vec!["?"; headers.len()].join(", ");
        let insert = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            headers.join(", ")
        );

        let mut conn = self.connect()?;
        conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
            let mut inserted = 0u64;
            for record in reader.records() {
                let record = record?;
                let mut statement = sql_query(insert.as_str()).into_boxed::<Sqlite>();
                for cell in record.iter() {
                    statement = statement.bind::<Text, _>(cell.to_string());
                }
                statement.execute(conn)?;
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    fn export_table_csv(
        &mut self,
        table: &str,
        date_filter: Option<NaiveDate>,
        out_path: &Path,
    ) -> Result<u64, DatabaseError> {
        validate_identifier(table)?;
        let mut conn = self.connect()?;

        let columns = Self::column_names(&mut conn, table)?;
        if columns.is_empty() {
            return Err(DatabaseError::Export(format!("table '{table}' has no columns")));
        }
        let select = format!(
            "SELECT json_array({}) AS row_json FROM {table}",
            columns.join(", ")
        );

        let rows: Vec<JsonRow> = match date_filter {
            Some(date) => sql_query(format!(
                "{select} WHERE date({DATE_COLUMN}) = ?"
            ))
            .bind::<Text, _>(ymd(date))
            .load(&mut conn)?,
            None => sql_query(select).load(&mut conn)?,
        };

        let mut writer = csv::Writer::from_path(out_path)?;
        writer.write_record(&columns)?;
        let mut exported = 0u64;
        for row in rows {
            let cells: Vec<serde_json::Value> = serde_json::from_str(&row.row_json)
                .map_err(|e| DatabaseError::Export(format!("bad export row: {e}")))?;
            let rendered: Vec<String> = cells.into_iter().map(render_cell).collect();
            writer.write_record(&rendered)?;
            exported += 1;
        }
        writer.flush()?;
        Ok(exported)
    }

    fn truncate_table(&mut self, table: &str) -> Result<(), DatabaseError> {
        validate_identifier(table)?;
        let mut conn = self.connect()?;
        // SQLite spelling of TRUNCATE.
        sql_query(format!("DELETE FROM {table}")).execute(&mut conn)?;
        Ok(())
    }

    fn delete_rows_for_date(
        &mut self,
        table: &str,
        run_date: NaiveDate,
    ) -> Result<u64, DatabaseError> {
        validate_identifier(table)?;
        let mut conn = self.connect()?;
        let removed = sql_query(format!(
            "DELETE FROM {table} WHERE date({DATE_COLUMN}) = ?"
        ))
        .bind::<Text, _>(ymd(run_date))
        .execute(&mut conn)?;
        Ok(removed as u64)
    }

    fn count_rows(&mut self, table: &str) -> Result<i64, DatabaseError> {
        validate_identifier(table)?;
        let mut conn = self.connect()?;
        let row: CountRow =
            sql_query(format!("SELECT COUNT(*) AS n FROM {table}")).get_result(&mut conn)?;
        Ok(row.n)
    }

    fn count_rows_for_date(
        &mut self,
        table: &str,
        run_date: NaiveDate,
    ) -> Result<i64, DatabaseError> {
        validate_identifier(table)?;
        let mut conn = self.connect()?;
        let row: CountRow = sql_query(format!(
            "SELECT COUNT(*) AS n FROM {table} WHERE date({DATE_COLUMN}) = ?"
        ))
        .bind::<Text, _>(ymd(run_date))
        .get_result(&mut conn)?;
        Ok(row.n)
    }
}

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`, at most 64 characters.
pub fn validate_identifier(name: &str) -> Result<(), DatabaseError> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_head && valid_tail && name.len() <= 64 {
        Ok(())
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

fn render_cell(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(validate_identifier("stg_market_prices").is_ok());
        assert!(validate_identifier("_hidden").is_ok());
        assert!(validate_identifier("Dim2").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("bad-name").is_err());
        assert!(validate_identifier("drop table;--").is_err());
        assert!(validate_identifier(&"x".repeat(65)).is_err());
    }
}
