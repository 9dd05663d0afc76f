//! Staging load: bulk-load the crawled CSV into the staging table.

use std::path::PathBuf;

use anyhow::bail;
use price_crawler::source::FetchWindow;
use tracing::info;

use crate::{
    database::Database,
    dates::staging_file_name,
    ledger::RowCounts,
    stages::{BodyOutcome, RunContext, StageBody},
};

/// The staging table the crawl CSV is loaded into.
pub const STAGING_TABLE: &str = "stg_market_prices";

/// Work unit for the staging-load stage.
pub struct LoadStagingBody {
    staging: Box<dyn Database>,
    staging_dir: PathBuf,
    file_prefix: String,
}

impl LoadStagingBody {
    /// A staging-load body reading the CSV the crawl stage produced.
    pub fn new(staging: Box<dyn Database>, staging_dir: PathBuf, file_prefix: String) -> Self {
        Self {
            staging,
            staging_dir,
            file_prefix,
        }
    }
}

impl StageBody for LoadStagingBody {
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome> {
        let window = FetchWindow::week_ending(run.target_date);
        let file_name = staging_file_name(&self.file_prefix, &window);
        let path = self.staging_dir.join(&file_name);

        // The upstream gate already certified a successful crawl, so a
        // missing file is an inconsistency, never a skip.
        if !path.exists() {
            bail!(
                "staging file {} not found although the crawl reported success",
                path.display()
            );
        }

        // The staging table holds exactly one window's worth of rows.
        self.staging.truncate_table(STAGING_TABLE)?;
        let loaded = self.staging.bulk_load_csv(STAGING_TABLE, &path)? as i64;
        info!(file = %path.display(), rows = loaded, "staging load complete");

        Ok(BodyOutcome::Done {
            counts: RowCounts {
                loaded: Some(loaded),
                ..RowCounts::none()
            },
            summary: format!("Loaded: {file_name}"),
        })
    }
}
