//! Static pipeline configuration, loaded once at process entry.
//!
//! This covers what must exist before the control store is reachable: where
//! the four stores live, where their procedure scripts are installed, and how
//! to reach the SMTP relay. Everything operators tune between runs
//! (directories, procedure names, recipients) lives in the control store's
//! `config` table instead; see [`crate::params::ParameterStore`].
//!
//! The loaded [`PipelineConfig`] is immutable and passed by reference into
//! the runner and stage bodies; there is no global configuration state.

use std::{fs, path::{Path, PathBuf}};

use anyhow::Context;
use serde::Deserialize;

/// Top-level configuration file (TOML).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// The control store (parameters + process ledger).
    pub control: StoreConfig,
    /// The staging store the crawl CSV is loaded into.
    pub staging: StoreConfig,
    /// The warehouse store.
    pub warehouse: StoreConfig,
    /// The datamart store.
    pub datamart: StoreConfig,
    /// SMTP relay settings; omit to disable email notifications.
    pub smtp: Option<SmtpConfig>,
}

/// One SQLite store.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path (or URL) of the SQLite database file.
    pub database: String,
    /// Directory holding this store's procedure scripts (`<name>.sql`).
    pub procedures: Option<PathBuf>,
}

/// SMTP relay settings. The password comes from the `SMTP_PASSWORD`
/// environment variable, never from this file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    /// Relay host name.
    pub host: String,
    /// Relay port (STARTTLS).
    pub port: u16,
    /// Sender mailbox, e.g. `"ETL <etl@example.com>"`.
    pub from: String,
    /// Relay login user.
    pub username: String,
}

/// Read and parse the configuration file at `path`.
pub fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: PipelineConfig =
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_file() {
        let text = r#"
            [control]
            database = "control.db"

            [staging]
            database = "staging.db"
            procedures = "procedures/staging"

            [warehouse]
            database = "warehouse.db"
            procedures = "procedures/warehouse"

            [datamart]
            database = "datamart.db"
        "#;
        let config: PipelineConfig = toml::from_str(text).unwrap();
        assert_eq!(config.control.database, "control.db");
        assert_eq!(
            config.staging.procedures.as_deref(),
            Some(Path::new("procedures/staging"))
        );
        assert!(config.smtp.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = r#"
            [control]
            database = "control.db"
            cache = true
        "#;
        assert!(toml::from_str::<PipelineConfig>(text).is_err());
    }
}
