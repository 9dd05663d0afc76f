//! The six stage work units.
//!
//! A [`StageBody`] does exactly one stage's work and reports a normalized
//! outcome; all gating, ledger writes, and notification belong to
//! [`crate::runner::StageRunner`]. Bodies are constructed at process entry
//! with every parameter they need already resolved, so a missing parameter
//! fails before any ledger write.

mod crawl;
mod insert_aggregate;
mod jobs;
mod load_datamart;
mod load_staging;
mod load_warehouse;
mod transform;

pub use crawl::CrawlBody;
pub use insert_aggregate::{AGGREGATE_TABLE, InsertAggregateBody};
pub use jobs::{ClearMode, LoadJob, clean_temp_csvs, export_jobs, run_load_jobs};
pub use load_datamart::{DATAMART_JOBS, LoadDatamartBody};
pub use load_staging::{LoadStagingBody, STAGING_TABLE};
pub use load_warehouse::{LoadWarehouseBody, WAREHOUSE_JOBS};
pub use transform::{TRANSFORM_TARGET_TABLE, TransformBody};

use chrono::NaiveDate;

use crate::ledger::RowCounts;

/// The resolved dates a body runs against.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// The business date being processed.
    pub target_date: NaiveDate,
    /// The wall-clock date of this attempt (the ledger key).
    pub log_date: NaiveDate,
    /// Whether the gates were bypassed for this run.
    pub force: bool,
}

/// What a body produced.
#[derive(Debug)]
pub enum BodyOutcome {
    /// The work ran; counts and a one-line summary for the ledger.
    Done {
        /// Reported row counters.
        counts: RowCounts,
        /// One-line success summary recorded in the ledger message.
        summary: String,
    },
    /// The source had nothing to process. Not an error; the runner records
    /// the stage's skip code.
    NoData {
        /// Explanation recorded in the ledger message.
        detail: String,
    },
}

/// One stage's unit of work.
pub trait StageBody {
    /// Perform the work for `run`. Any error becomes a logged terminal
    /// failure plus a non-zero process exit; the error chain is captured
    /// verbatim in the ledger message.
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome>;
}
