//! Aggregate stage: build the weekly price aggregate in the warehouse.

use tracing::info;

use crate::{
    database::Database,
    ledger::RowCounts,
    stages::{BodyOutcome, RunContext, StageBody},
};

/// The aggregate table; its per-date row count is the stage's verification.
pub const AGGREGATE_TABLE: &str = "agg_product_price_weekly";

/// Work unit for the aggregate-insert stage.
pub struct InsertAggregateBody {
    warehouse: Box<dyn Database>,
    procedure: String,
    clean: bool,
}

impl InsertAggregateBody {
    /// An aggregate body invoking `procedure(date, clean)` on the warehouse.
    pub fn new(warehouse: Box<dyn Database>, procedure: String, clean: bool) -> Self {
        Self {
            warehouse,
            procedure,
            clean,
        }
    }
}

impl StageBody for InsertAggregateBody {
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome> {
        self.warehouse
            .call_procedure(&self.procedure, run.target_date, Some(self.clean))?;

        let inserted = self
            .warehouse
            .count_rows_for_date(AGGREGATE_TABLE, run.target_date)?;
        info!(procedure = %self.procedure, rows = inserted, "aggregate insert complete");

        Ok(BodyOutcome::Done {
            counts: RowCounts {
                loaded: Some(inserted),
                ..RowCounts::none()
            },
            summary: "Insert completed successfully.".to_string(),
        })
    }
}
