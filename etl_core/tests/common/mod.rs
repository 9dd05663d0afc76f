#![allow(dead_code)]

use std::cell::RefCell;

use chrono::{NaiveDate, TimeZone, Utc};
use diesel::prelude::*;
use tempfile::TempDir;

use etl_core::{
    db,
    ledger::{LogEntry, ProcessLog, RowCounts},
    models::ProcessLogRow,
    notify::{Notifier, NotifyError},
    stages::{BodyOutcome, RunContext, StageBody},
};

pub struct TestControl {
    _dir: TempDir, // keep alive for the life of the test
    pub url: String,
}

pub fn setup_control() -> TestControl {
    let dir = TempDir::new().expect("tempdir");
    let url = dir.path().join("control.db").to_string_lossy().to_string();
    db::run_migrations(&url).expect("migrations");
    TestControl { _dir: dir, url }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Append a terminal row so gates see the given status for (process, date).
pub fn seed_status(
    ledger: &ProcessLog,
    process_id: i32,
    process_name: &str,
    run_date: NaiveDate,
    status: &str,
) {
    let at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
    ledger
        .append(&LogEntry {
            process_id,
            process_name,
            run_date,
            start_time: at,
            end_time: Some(at),
            status,
            counts: RowCounts::none(),
            message: None,
        })
        .expect("seed status");
}

pub fn all_rows(url: &str) -> Vec<ProcessLogRow> {
    use etl_core::schema::process_log::dsl as pl;
    let mut conn = db::connect_sqlite(url).expect("connect");
    pl::process_log
        .order(pl::id.asc())
        .select(ProcessLogRow::as_select())
        .load(&mut conn)
        .expect("process_log rows")
}

pub fn rows_for(url: &str, process_name: &str) -> Vec<ProcessLogRow> {
    all_rows(url)
        .into_iter()
        .filter(|row| row.process_name == process_name)
        .collect()
}

/// A body that plays back a prepared outcome and records its invocation.
pub struct ScriptedBody {
    outcome: Option<anyhow::Result<BodyOutcome>>,
    pub calls: usize,
    pub seen: Option<RunContext>,
}

impl ScriptedBody {
    pub fn succeeding(counts: RowCounts, summary: &str) -> Self {
        Self {
            outcome: Some(Ok(BodyOutcome::Done {
                counts,
                summary: summary.to_string(),
            })),
            calls: 0,
            seen: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self {
            outcome: Some(Err(anyhow::anyhow!(message))),
            calls: 0,
            seen: None,
        }
    }

    pub fn no_data(detail: &str) -> Self {
        Self {
            outcome: Some(Ok(BodyOutcome::NoData {
                detail: detail.to_string(),
            })),
            calls: 0,
            seen: None,
        }
    }
}

impl StageBody for ScriptedBody {
    fn execute(&mut self, run: &RunContext) -> anyhow::Result<BodyOutcome> {
        self.calls += 1;
        self.seen = Some(*run);
        self.outcome
            .take()
            .expect("scripted body invoked more than once")
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, subject: &str, body: &str, _recipients: &[String]) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub fn recipients() -> Vec<String> {
    vec!["ops@example.com".to_string()]
}
