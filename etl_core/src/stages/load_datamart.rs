//! Datamart load: export report feeds from the warehouse and rebuild the
//! datamart's report tables. Logs once, at the end.

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

/// The datamart load-job list. Report tables are fully rebuilt per run.
pub const DATAMART_JOBS: [LoadJob; 3] = [
    LoadJob {
        source_table: "exp_product_summary",
        target_table: "rpt_product_price_summary",
        file_stem: "export_product",
        clear: ClearMode::Truncate,
    },
    LoadJob {
        source_table: "exp_province_summary",
        target_table: "rpt_province_price_summary",
        file_stem: "export_province",
        clear: ClearMode::Truncate,
    },
    LoadJob {
        source_table: "exp_weekly_trend",
        target_table: "rpt_weekly_price_trend",
        file_stem: "export_weekly",
        clear: ClearMode::Truncate,
    },
];

/// Work unit for the datamart-load stage.
pub struct LoadDatamartBody {
    warehouse: Box<dyn Database>,
    datamart: Box<dyn Database>,
    export_procedure: String,
    temp_dir: PathBuf,
    clean: bool,
}

impl LoadDatamartBody {
    /// A datamart-load body exporting via `export_procedure` into `temp_dir`.
    pub fn new(
        warehouse: Box<dyn Database>,
        datamart: Box<dyn Database>,
        export_procedure: String,
        temp_dir: PathBuf,
        clean: bool,
    ) -> Self {
        Self {
            warehouse,
            datamart,
            export_procedure,
            temp_dir,
            clean,
        }
    }
}

impl StageBody for LoadDatamartBody {
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome> {
        if self.clean {
            let removed = clean_temp_csvs(&self.temp_dir, run.target_date)?;
            info!(removed, "cleaned previous export CSVs");
        }
        fs::create_dir_all(&self.temp_dir)?;

        self.warehouse
            .call_procedure(&self.export_procedure, run.target_date, None)?;
        let extracted = export_jobs(
            self.warehouse.as_mut(),
            &DATAMART_JOBS,
            run.target_date,
            &self.temp_dir,
        )?;

        let loaded = run_load_jobs(
            self.datamart.as_mut(),
            &DATAMART_JOBS,
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
