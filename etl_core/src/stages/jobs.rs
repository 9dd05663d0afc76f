//! Multi-file export/load job lists shared by the warehouse and datamart
//! load stages.
//!
//! A job list is strictly ordered: the first job whose CSV is missing or
//! whose table-clear fails aborts the whole list, and earlier jobs are not
//! rolled back. Recovery is re-running the date, so fact-like targets are
//! cleared per date rather than appended blindly.

use std::{fs, path::Path};

use anyhow::{Context, bail};
use chrono::NaiveDate;
use tracing::info;

use crate::{database::Database, dates::ymd};

/// How a load job prepares its target table before loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Dimension-like: append-only, never cleared.
    Append,
    /// Fact-like: rows for the run date are deleted before reload.
    DeleteForDate,
    /// Report-like: the whole table is rebuilt from the export.
    Truncate,
}

/// One (export table, CSV, target table) unit of a bulk load.
#[derive(Debug, Clone, Copy)]
pub struct LoadJob {
    /// Table the export procedure refreshed in the source store.
    pub source_table: &'static str,
    /// Table the CSV is loaded into in the target store.
    pub target_table: &'static str,
    /// CSV name stem; the file is `<stem>_<YYYY-MM-DD>.csv`.
    pub file_stem: &'static str,
    /// Target-table preparation policy.
    pub clear: ClearMode,
}

impl LoadJob {
    /// The job's CSV file name for `date`.
    pub fn csv_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.csv", self.file_stem, ymd(date))
    }
}

/// Delete `date`'s CSVs from `temp_dir` ahead of a fresh export. Returns the
/// number of files removed; a missing directory removes nothing.
pub fn clean_temp_csvs(temp_dir: &Path, date: NaiveDate) -> anyhow::Result<usize> {
    if !temp_dir.exists() {
        return Ok(0);
    }
    let marker = ymd(date);
    let mut removed = 0;
    for entry in fs::read_dir(temp_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains(&marker) && name.to_lowercase().ends_with(".csv") {
            fs::remove_file(entry.path())
                .with_context(|| format!("removing {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Export every job's source table to its CSV in `temp_dir`. Returns the
/// total exported row count.
pub fn export_jobs(
    source: &mut dyn Database,
    jobs: &[LoadJob],
    date: NaiveDate,
    temp_dir: &Path,
) -> anyhow::Result<i64> {
    let mut total = 0i64;
    for job in jobs {
        let path = temp_dir.join(job.csv_name(date));
        let exported = source
            .export_table_csv(job.source_table, None, &path)
            .with_context(|| format!("exporting {} to {}", job.source_table, path.display()))?;
        info!(table = job.source_table, file = %path.display(), rows = exported, "exported");
        total += exported as i64;
    }
    Ok(total)
}

/// Run the ordered load phase: per job, require the CSV, prepare the target
/// table per its [`ClearMode`], bulk-load, and verify by counting. The first
/// failure stops the sequence, naming the failing job; earlier jobs stay
/// applied.
pub fn run_load_jobs(
    target: &mut dyn Database,
    jobs: &[LoadJob],
    date: NaiveDate,
    temp_dir: &Path,
) -> anyhow::Result<i64> {
    let mut total = 0i64;
    for job in jobs {
        let path = temp_dir.join(job.csv_name(date));
        if !path.exists() {
            bail!(
                "CSV file not found for load job '{}': {}",
                job.target_table,
                path.display()
            );
        }

        match job.clear {
            ClearMode::Append => {}
            ClearMode::DeleteForDate => {
                target
                    .delete_rows_for_date(job.target_table, date)
                    .with_context(|| format!("clearing {} for {}", job.target_table, ymd(date)))?;
            }
            ClearMode::Truncate => {
                target
                    .truncate_table(job.target_table)
                    .with_context(|| format!("table clear failed for {}", job.target_table))?;
            }
        }

        target
            .bulk_load_csv(job.target_table, &path)
            .with_context(|| format!("loading {} into {}", path.display(), job.target_table))?;

        let loaded = match job.clear {
            ClearMode::DeleteForDate => target.count_rows_for_date(job.target_table, date)?,
            _ => target.count_rows(job.target_table)?,
        };
        info!(table = job.target_table, rows = loaded, "load job complete");
        total += loaded;
    }
    Ok(total)
}
