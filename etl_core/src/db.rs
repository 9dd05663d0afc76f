//! Control-store plumbing: tuned SQLite connections and embedded migrations.
//!
//! Every component opens its own short-lived connection through
//! [`connect_sqlite`] right before use and drops it on return, so a control
//! store outage only affects the single call in flight.

use anyhow::anyhow;
use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Embedded Diesel migrations for the control store.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Open a SQLite connection with connection-wide PRAGMAs applied:
/// WAL journaling, foreign_keys=ON, and a 5000ms busy_timeout.
pub fn connect_sqlite(database_url: &str) -> anyhow::Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;

    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}

/// Apply pending control-store migrations at the given URL.
pub fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let mut conn = SqliteConnection::establish(database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::connection::SimpleConnection;

    #[test]
    fn migrations_apply_on_temp_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path().to_string_lossy().to_string();

        run_migrations(&path).expect("migration run");

        let mut conn = connect_sqlite(&path).unwrap();
        conn.batch_execute(
            "INSERT INTO config (config_key, config_value) VALUES ('STAGING_DIR', './staging')",
        )
        .unwrap();
    }
}
