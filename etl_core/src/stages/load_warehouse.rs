//! Warehouse load: export from staging, then bulk-load dimensions and the
//! fact table. Logs once, at the end, with combined export/load results.

use std::{fs, path::PathBuf};

use tracing::info;

use crate::{
    database::Database,
    ledger::RowCounts,
    stages::{
        BodyOutcome, RunContext, StageBody,
        jobs::{ClearMode, LoadJob, clean_temp_csvs, export_jobs, run_load_jobs},
    },
};

/// The warehouse load-job list, in load order. Dimensions are append-only;
/// the fact table is cleared per run date so a date can be re-run.
pub const WAREHOUSE_JOBS: [LoadJob; 3] = [
    LoadJob {
        source_table: "exp_product",
        target_table: "dim_product",
        file_stem: "export_product",
        clear: ClearMode::Append,
    },
    LoadJob {
        source_table: "exp_province",
        target_table: "dim_province",
        file_stem: "export_province",
        clear: ClearMode::Append,
    },
    LoadJob {
        source_table: "exp_fact",
        target_table: "fact_product_price",
        file_stem: "export_fact",
        clear: ClearMode::DeleteForDate,
    },
];

/// Work unit for the warehouse-load stage.
pub struct LoadWarehouseBody {
    staging: Box<dyn Database>,
    warehouse: Box<dyn Database>,
    export_procedure: String,
    temp_dir: PathBuf,
    clean: bool,
}

impl LoadWarehouseBody {
    /// A warehouse-load body exporting via `export_procedure` into
    /// `temp_dir`. `clean=false` keeps the date's previously exported CSVs.
    pub fn new(
        staging: Box<dyn Database>,
        warehouse: Box<dyn Database>,
        export_procedure: String,
        temp_dir: PathBuf,
        clean: bool,
    ) -> Self {
        Self {
            staging,
            warehouse,
            export_procedure,
            temp_dir,
            clean,
        }
    }
}

impl StageBody for LoadWarehouseBody {
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome> {
        if self.clean {
            let removed = clean_temp_csvs(&self.temp_dir, run.target_date)?;
            info!(removed, "cleaned previous export CSVs");
        }
        fs::create_dir_all(&self.temp_dir)?;

        self.staging
            .call_procedure(&self.export_procedure, run.target_date, None)?;
        let extracted = export_jobs(
            self.staging.as_mut(),
            &WAREHOUSE_JOBS,
            run.target_date,
            &self.temp_dir,
        )?;

        let loaded = run_load_jobs(
            self.warehouse.as_mut(),
            &WAREHOUSE_JOBS,
            run.target_date,
            &self.temp_dir,
        )?;

        Ok(BodyOutcome::Done {
            counts: RowCounts {
                extracted: Some(extracted),
                loaded: Some(loaded),
                transformed: None,
            },
            summary: "Export and load completed successfully.".to_string(),
        })
    }
}
