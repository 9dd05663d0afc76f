//! Crawl stage: pull the listing for the window ending at the target date
//! and persist it as the staged CSV.

use std::{fs, path::PathBuf};

use anyhow::Context;
use price_crawler::source::{FetchOutcome, FetchWindow, PriceSource};
use tracing::info;

use crate::{
    dates::staging_file_name,
    ledger::RowCounts,
    stages::{BodyOutcome, RunContext, StageBody},
};

/// Work unit for the crawl stage.
pub struct CrawlBody {
    source: Box<dyn PriceSource>,
    staging_dir: PathBuf,
    file_prefix: String,
}

impl CrawlBody {
    /// A crawl body writing `<staging_dir>/<prefix>_<start>_<end>.csv`.
    pub fn new(source: Box<dyn PriceSource>, staging_dir: PathBuf, file_prefix: String) -> Self {
        Self {
            source,
            staging_dir,
            file_prefix,
        }
    }
}

impl StageBody for CrawlBody {
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome> {
        let window = FetchWindow::week_ending(run.target_date);
        fs::create_dir_all(&self.staging_dir)
            .with_context(|| format!("creating staging dir {}", self.staging_dir.display()))?;

        let table = match self.source.fetch_window(&window)? {
            FetchOutcome::NoData => None,
            FetchOutcome::Table(table) if table.is_empty() => None,
            FetchOutcome::Table(table) => Some(table),
        };

        let Some(table) = table else {
            return Ok(BodyOutcome::NoData {
                detail: format!(
                    "no rows published for {} - {}",
                    window.start_form(),
                    window.end_form()
                ),
            });
        };

        let file_name = staging_file_name(&self.file_prefix, &window);
        let path = self.staging_dir.join(&file_name);
        let extracted = table
            .write_csv(&path)
            .with_context(|| format!("writing {}", path.display()))? as i64;
        info!(file = %path.display(), rows = extracted, "crawl saved staging CSV");

        Ok(BodyOutcome::Done {
            counts: RowCounts {
                extracted: Some(extracted),
                ..RowCounts::none()
            },
            summary: format!("Saved: {file_name}"),
        })
    }
}
