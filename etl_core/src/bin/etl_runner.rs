//! CLI entry point: one subcommand per pipeline stage.

use std::path::Path;

use anyhow::Result;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use etl_core::{
    config::{self, PipelineConfig},
    database::SqliteDatabase,
    db,
    ledger::ProcessLog,
    notify::{Notifier, NullNotifier, SmtpNotifier},
    params::ParameterStore,
    runner::{StageOutcome, StageRunner},
    stages::{
        CrawlBody, InsertAggregateBody, LoadDatamartBody, LoadStagingBody, LoadWarehouseBody,
        StageBody, TransformBody,
    },
    status::StageName,
};
use price_crawler::http::HttpSource;

const PARAM_SOURCE_URL: &str = "SOURCE_URL";
const PARAM_STAGING_DIR: &str = "STAGING_DIR";
const PARAM_FILE_PREFIX: &str = "STAGING_FILE_PREFIX";
const PARAM_TRANSFORM_PROCEDURE: &str = "TRANSFORM_PROCEDURE";
const PARAM_WAREHOUSE_EXPORT_PROCEDURE: &str = "WAREHOUSE_EXPORT_PROCEDURE";
const PARAM_WAREHOUSE_TEMP_DIR: &str = "WAREHOUSE_TEMP_DIR";
const PARAM_AGGREGATE_PROCEDURE: &str = "AGGREGATE_PROCEDURE";
const PARAM_DATAMART_EXPORT_PROCEDURE: &str = "DATAMART_EXPORT_PROCEDURE";
const PARAM_DATAMART_TEMP_DIR: &str = "DATAMART_TEMP_DIR";
const PARAM_NOTIFY_RECIPIENTS: &str = "NOTIFY_RECIPIENTS";

const DEFAULT_STAGING_DIR: &str = "./staging";
const DEFAULT_FILE_PREFIX: &str = "market_prices";

#[derive(Parser)]
#[command(version, about = "Market price ETL pipeline runner")]
struct Cli {
    /// Path to the pipeline config file (etl.toml)
    #[arg(short, long, value_name = "FILE")]
    config: String,

    #[command(subcommand)]
    stage: StageCmd,
}

#[derive(Args)]
struct RunArgs {
    /// Target business date (YYYY-MM-DD, dd/mm/YYYY, YYYY/mm/dd or
    /// dd-mm-YYYY); defaults to today
    #[arg(long)]
    date: Option<String>,

    /// Bypass the upstream and already-done gates
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct CleanArgs {
    /// Keep the date's previously exported CSVs (skip the pre-clean)
    #[arg(long)]
    no_clean: bool,
}

#[derive(Subcommand)]
enum StageCmd {
    /// Crawl the price listing for the 7-day window ending at the target date
    Crawl {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Bulk-load the crawled CSV into the staging store
    LoadStaging {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run the transform procedure on the staging store
    Transform {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Export from staging and load the warehouse tables
    LoadWarehouse {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        clean: CleanArgs,
    },
    /// Build the weekly aggregate in the warehouse
    InsertAggregate {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        clean: CleanArgs,
    },
    /// Export from the warehouse and load the datamart report tables
    LoadDatamart {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        clean: CleanArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config::load_config(Path::new(&cli.config))?;
    db::run_migrations(&config.control.database)?;

    let params = ParameterStore::new(&config.control.database);
    let ledger = ProcessLog::new(&config.control.database);
    let notifier: Box<dyn Notifier> = match &config.smtp {
        Some(smtp) => Box::new(SmtpNotifier::from_config(smtp)?),
        None => Box::new(NullNotifier),
    };
    let recipients = recipient_list(&params)?;
    let today = Local::now().date_naive();

    let (stage, run_args, mut body) = build_stage(&cli.stage, &config, &params)?;

    let runner = StageRunner::new(&ledger, notifier.as_ref(), &recipients, today);
    let outcome = runner.run(stage, body.as_mut(), run_args.date.as_deref(), run_args.force)?;

    match outcome {
        StageOutcome::Completed { counts } => {
            info!(stage = %stage, ?counts, "stage completed")
        }
        StageOutcome::SkippedNoData => info!(stage = %stage, "no data; skip recorded"),
        StageOutcome::AlreadyCompleted => {
            info!(stage = %stage, "already completed for this date; nothing to do")
        }
    }
    Ok(())
}

/// Resolve parameters and wire up the requested stage's work unit.
fn build_stage<'a>(
    cmd: &'a StageCmd,
    config: &PipelineConfig,
    params: &ParameterStore,
) -> Result<(StageName, &'a RunArgs, Box<dyn StageBody>)> {
    match cmd {
        StageCmd::Crawl { run } => {
            let url = params.require(PARAM_SOURCE_URL)?;
            let staging_dir = params.get_or(PARAM_STAGING_DIR, DEFAULT_STAGING_DIR)?;
            let prefix = params.get_or(PARAM_FILE_PREFIX, DEFAULT_FILE_PREFIX)?;
            let source = HttpSource::new(url)?;
            let body = CrawlBody::new(Box::new(source), staging_dir.into(), prefix);
            Ok((StageName::Crawl, run, Box::new(body)))
        }
        StageCmd::LoadStaging { run } => {
            let staging_dir = params.get_or(PARAM_STAGING_DIR, DEFAULT_STAGING_DIR)?;
            let prefix = params.get_or(PARAM_FILE_PREFIX, DEFAULT_FILE_PREFIX)?;
            let staging = SqliteDatabase::from_store(&config.staging);
            let body = LoadStagingBody::new(Box::new(staging), staging_dir.into(), prefix);
            Ok((StageName::LoadStaging, run, Box::new(body)))
        }
        StageCmd::Transform { run } => {
            let procedure = params.require(PARAM_TRANSFORM_PROCEDURE)?;
            let staging = SqliteDatabase::from_store(&config.staging);
            let body = TransformBody::new(Box::new(staging), procedure);
            Ok((StageName::Transform, run, Box::new(body)))
        }
        StageCmd::LoadWarehouse { run, clean } => {
            let procedure = params.require(PARAM_WAREHOUSE_EXPORT_PROCEDURE)?;
            let temp_dir = params.require(PARAM_WAREHOUSE_TEMP_DIR)?;
            let staging = SqliteDatabase::from_store(&config.staging);
            let warehouse = SqliteDatabase::from_store(&config.warehouse);
            let body = LoadWarehouseBody::new(
                Box::new(staging),
                Box::new(warehouse),
                procedure,
                temp_dir.into(),
                !clean.no_clean,
            );
            Ok((StageName::LoadWarehouse, run, Box::new(body)))
        }
        StageCmd::InsertAggregate { run, clean } => {
            let procedure = params.require(PARAM_AGGREGATE_PROCEDURE)?;
            let warehouse = SqliteDatabase::from_store(&config.warehouse);
            let body = InsertAggregateBody::new(Box::new(warehouse), procedure, !clean.no_clean);
            Ok((StageName::InsertAggregate, run, Box::new(body)))
        }
        StageCmd::LoadDatamart { run, clean } => {
            let procedure = params.require(PARAM_DATAMART_EXPORT_PROCEDURE)?;
            let temp_dir = params.require(PARAM_DATAMART_TEMP_DIR)?;
            let warehouse = SqliteDatabase::from_store(&config.warehouse);
            let datamart = SqliteDatabase::from_store(&config.datamart);
            let body = LoadDatamartBody::new(
                Box::new(warehouse),
                Box::new(datamart),
                procedure,
                temp_dir.into(),
                !clean.no_clean,
            );
            Ok((StageName::LoadDatamart, run, Box::new(body)))
        }
    }
}

fn recipient_list(params: &ParameterStore) -> Result<Vec<String>> {
    let raw = params.get(PARAM_NOTIFY_RECIPIENTS)?;
    Ok(raw
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}
