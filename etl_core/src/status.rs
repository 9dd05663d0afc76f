//! Stage identities and their status vocabularies.
//!
//! Every stage carries a closed set of status codes, kept distinct per stage
//! family because downstream gates match on exact codes. The lifecycle is
//! PENDING (no ledger row) → RUNNING (only for stages that write a start
//! marker) → terminal (success | failure | skip). The per-stage differences
//! (which upstream to gate on, which codes count as "done", whether a running
//! marker is written) are data here, not control flow.

use std::fmt;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    /// Pull the price listing for the window ending at the target date.
    Crawl,
    /// Bulk-load the crawled CSV into the staging store.
    LoadStaging,
    /// Normalize staged rows via the transform procedure.
    Transform,
    /// Export from staging and load the warehouse dimension/fact tables.
    LoadWarehouse,
    /// Build the weekly aggregate in the warehouse.
    InsertAggregate,
    /// Export from the warehouse and load the datamart report tables.
    LoadDatamart,
}

impl StageName {
    /// The ledger key for this stage.
    pub fn process_name(self) -> &'static str {
        self.spec().process_name
    }

    /// The status-vocabulary row for this stage.
    pub fn spec(self) -> &'static StageSpec {
        &SPECS[self as usize]
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.process_name())
    }
}

/// Per-stage configuration of the gating/logging protocol.
#[derive(Debug)]
pub struct StageSpec {
    /// The stage this row describes.
    pub stage: StageName,
    /// Run-config identifier recorded with every ledger row.
    pub process_id: i32,
    /// Ledger key.
    pub process_name: &'static str,
    /// The one upstream stage gated on, if any.
    pub upstream: Option<StageName>,
    /// Upstream statuses that open the gate.
    pub upstream_success: &'static [&'static str],
    /// Running-marker code; stages without one log only the terminal entry,
    /// trading crash visibility for fewer writes.
    pub running_code: Option<&'static str>,
    /// Terminal success code.
    pub success_code: &'static str,
    /// Terminal failure code.
    pub failure_code: &'static str,
    /// Terminal no-data/skip code, for stages that can skip.
    pub skip_code: Option<&'static str>,
    /// Codes that mean "already completed for this date" at the
    /// self-idempotency gate.
    pub done_codes: &'static [&'static str],
}

static SPECS: [StageSpec; 6] = [
    StageSpec {
        stage: StageName::Crawl,
        process_id: 1,
        process_name: "crawl",
        upstream: None,
        upstream_success: &[],
        running_code: Some("START"),
        success_code: "CS",
        failure_code: "CF",
        skip_code: Some("CND"),
        done_codes: &["CS", "CND"],
    },
    StageSpec {
        stage: StageName::LoadStaging,
        process_id: 2,
        process_name: "load_staging",
        upstream: Some(StageName::Crawl),
        upstream_success: &["CS"],
        running_code: Some("LR"),
        success_code: "LS",
        failure_code: "LF",
        skip_code: Some("LS_SKIP"),
        done_codes: &["LS", "LS_SKIP"],
    },
    StageSpec {
        stage: StageName::Transform,
        process_id: 3,
        process_name: "transform",
        upstream: Some(StageName::LoadStaging),
        upstream_success: &["LS"],
        running_code: None,
        success_code: "TS",
        failure_code: "TF",
        skip_code: None,
        done_codes: &["TS"],
    },
    StageSpec {
        stage: StageName::LoadWarehouse,
        process_id: 4,
        process_name: "load_warehouse",
        upstream: Some(StageName::Transform),
        upstream_success: &["TS"],
        running_code: None,
        success_code: "LS",
        failure_code: "LF",
        skip_code: None,
        done_codes: &["LS"],
    },
    StageSpec {
        stage: StageName::InsertAggregate,
        process_id: 5,
        process_name: "insert_aggregate",
        upstream: Some(StageName::LoadWarehouse),
        upstream_success: &["LS"],
        running_code: None,
        success_code: "IS",
        failure_code: "IF",
        skip_code: None,
        done_codes: &["IS"],
    },
    StageSpec {
        stage: StageName::LoadDatamart,
        process_id: 6,
        process_name: "load_datamart",
        upstream: Some(StageName::InsertAggregate),
        upstream_success: &["IS"],
        running_code: None,
        success_code: "IS",
        failure_code: "IF",
        skip_code: None,
        done_codes: &["IS"],
    },
];
