//! Transform stage: run the normalization procedure on the staging store.

use tracing::info;

use crate::{
    database::Database,
    ledger::RowCounts,
    stages::{BodyOutcome, RunContext, StageBody},
};

/// Table the transform procedure writes its normalized rows into; the row
/// count here is the stage's verification, not the procedure's own signal.
pub const TRANSFORM_TARGET_TABLE: &str = "clean_market_prices";

/// Work unit for the transform stage.
pub struct TransformBody {
    staging: Box<dyn Database>,
    procedure: String,
}

impl TransformBody {
    /// A transform body invoking `procedure` on the staging store.
    pub fn new(staging: Box<dyn Database>, procedure: String) -> Self {
        Self { staging, procedure }
    }
}

impl StageBody for TransformBody {
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome> {
        self.staging
            .call_procedure(&self.procedure, run.target_date, None)?;

        // Procedure call-status is unreliable when the procedure uses
        // insert-select internally; count the effect instead.
        let transformed = self
            .staging
            .count_rows_for_date(TRANSFORM_TARGET_TABLE, run.target_date)?;
        info!(procedure = %self.procedure, rows = transformed, "transform complete");

        Ok(BodyOutcome::Done {
            counts: RowCounts {
                transformed: Some(transformed),
                ..RowCounts::none()
            },
            summary: "Transform completed successfully.".to_string(),
        })
    }
}
