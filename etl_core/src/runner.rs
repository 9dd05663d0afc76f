//! The dependency-gated stage execution protocol.
//!
//! [`StageRunner::run`] is the one place the gating/logging/notification
//! sequence lives; per-stage differences are data in [`StageSpec`] and
//! behavior in the given [`StageBody`]. The sequence is strict, with no
//! backtracking:
//!
//! 1. resolve the target date (fail fast, no side effects);
//! 2. upstream gate (unless forced): today's ledger row first, falling back
//!    to the target date's row when today has none;
//! 3. self idempotency gate (unless forced), same fallback;
//! 4. running marker, for stages that declare one;
//! 5. execute the body;
//! 6. exactly one terminal ledger write;
//! 7. best-effort notification, then propagate any failure.
//!
//! The upstream gate runs before the self gate so a single ledger row tells
//! an operator the root cause: checking self first could hide that the
//! upstream failed and this stage never ran.
//!
//! The self-idempotency check and the eventual append are not atomic against
//! a concurrent invocation of the same stage; a single concurrent invocation
//! per stage is assumed (nothing in the ledger takes a lock or lease).

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::{
    dates::{resolve_target_date, ymd},
    error::StageError,
    ledger::{LogEntry, ProcessLog, RowCounts},
    notify::{Notifier, dispatch},
    stages::{BodyOutcome, RunContext, StageBody},
    status::{StageName, StageSpec},
};

/// How a stage invocation ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The body ran and a terminal success entry was written.
    Completed {
        /// Counters reported by the body.
        counts: RowCounts,
    },
    /// The upstream (or the body) reported no data; a skip entry was written.
    SkippedNoData,
    /// This stage already holds a done status for the date; nothing was
    /// written or executed. Benign.
    AlreadyCompleted,
}

/// Executes stages against the ledger, parameterized by today's date so the
/// log-date policy is deterministic under test.
pub struct StageRunner<'a> {
    ledger: &'a ProcessLog,
    notifier: &'a dyn Notifier,
    recipients: &'a [String],
    today: NaiveDate,
}

impl<'a> StageRunner<'a> {
    /// A runner writing to `ledger` and notifying `recipients`.
    pub fn new(
        ledger: &'a ProcessLog,
        notifier: &'a dyn Notifier,
        recipients: &'a [String],
        today: NaiveDate,
    ) -> Self {
        Self {
            ledger,
            notifier,
            recipients,
            today,
        }
    }

    /// Run one stage for the optional `--date` argument.
    pub fn run(
        &self,
        stage: StageName,
        body: &mut dyn StageBody,
        target_date: Option<&str>,
        force: bool,
    ) -> Result<StageOutcome, StageError> {
        let spec = stage.spec();
        let target = resolve_target_date(target_date, self.today)?;
        let log_date = self.today;
        info!(stage = spec.process_name, target = %target, force, "starting stage");

        if force {
            warn!(stage = spec.process_name, "force mode: bypassing upstream and idempotency gates");
        } else {
            if let Some(outcome) = self.upstream_gate(spec, log_date, target)? {
                return Ok(outcome);
            }
            if self.already_done(spec, log_date, target)? {
                info!(stage = spec.process_name, "already completed for this date; skipping");
                return Ok(StageOutcome::AlreadyCompleted);
            }
        }

        let start_time = Utc::now();
        if let Some(code) = spec.running_code {
            self.append(spec, log_date, start_time, None, code, RowCounts::none(),
                format!("Target date {}", ymd(target)))?;
        }

        let run = RunContext {
            target_date: target,
            log_date,
            force,
        };
        match body.execute(&run) {
            Ok(BodyOutcome::Done { counts, summary }) => {
                self.append(spec, log_date, start_time, Some(Utc::now()),
                    spec.success_code, counts, summary.clone())?;
                self.notify_success(spec, target, &counts, &summary);
                Ok(StageOutcome::Completed { counts })
            }
            Ok(BodyOutcome::NoData { detail }) => match spec.skip_code {
                Some(skip) => {
                    info!(stage = spec.process_name, detail = %detail, "no data; recording skip");
                    self.append(spec, log_date, start_time, Some(Utc::now()),
                        skip, RowCounts::zero(), detail)?;
                    Ok(StageOutcome::SkippedNoData)
                }
                None => Err(self.fail(
                    spec,
                    log_date,
                    start_time,
                    target,
                    format!("no-data outcome but '{}' declares no skip status: {detail}", spec.process_name),
                )),
            },
            Err(e) => Err(self.fail(spec, log_date, start_time, target, format!("{e:#}"))),
        }
    }

    /// Evaluate the upstream gate. `Ok(None)` means proceed; `Ok(Some(..))`
    /// short-circuits with a benign outcome.
    fn upstream_gate(
        &self,
        spec: &StageSpec,
        log_date: NaiveDate,
        target: NaiveDate,
    ) -> Result<Option<StageOutcome>, StageError> {
        let Some(upstream) = spec.upstream else {
            return Ok(None);
        };
        let upstream_spec = upstream.spec();
        let status = self.lookup(upstream_spec.process_name, log_date, target)?;

        match status.as_deref() {
            Some(code) if spec.upstream_success.contains(&code) => {
                info!(upstream = upstream_spec.process_name, status = code, "upstream gate open");
                Ok(None)
            }
            Some(code) if upstream_spec.skip_code == Some(code) => {
                if let Some(skip) = spec.skip_code {
                    let now = Utc::now();
                    info!(upstream = upstream_spec.process_name, "upstream reported no data; skipping");
                    self.append(spec, log_date, now, Some(now), skip, RowCounts::zero(),
                        format!("Skipped: no data from {}", upstream_spec.process_name))?;
                    Ok(Some(StageOutcome::SkippedNoData))
                } else {
                    Err(StageError::UpstreamNotReady {
                        upstream: upstream_spec.process_name,
                        log_date,
                        status: code.to_string(),
                    })
                }
            }
            other => Err(StageError::UpstreamNotReady {
                upstream: upstream_spec.process_name,
                log_date,
                status: other.unwrap_or("absent").to_string(),
            }),
        }
    }

    fn already_done(
        &self,
        spec: &StageSpec,
        log_date: NaiveDate,
        target: NaiveDate,
    ) -> Result<bool, StageError> {
        let status = self.lookup(spec.process_name, log_date, target)?;
        Ok(status
            .as_deref()
            .is_some_and(|code| spec.done_codes.contains(&code)))
    }

    /// Latest status for `process` on the log date, falling back to the
    /// target date's entry when today has none. The fallback is a first-class
    /// rule: a stage run late in the day must still see a backfill run keyed
    /// on the target date.
    fn lookup(
        &self,
        process: &str,
        log_date: NaiveDate,
        target: NaiveDate,
    ) -> Result<Option<String>, StageError> {
        let found = self
            .ledger
            .latest_status(process, log_date)
            .map_err(StageError::Ledger)?;
        if found.is_none() && target != log_date {
            return self
                .ledger
                .latest_status(process, target)
                .map_err(StageError::Ledger);
        }
        Ok(found)
    }

    fn append(
        &self,
        spec: &StageSpec,
        run_date: NaiveDate,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        status: &str,
        counts: RowCounts,
        message: String,
    ) -> Result<(), StageError> {
        self.ledger
            .append(&LogEntry {
                process_id: spec.process_id,
                process_name: spec.process_name,
                run_date,
                start_time,
                end_time,
                status,
                counts,
                message: Some(message),
            })
            .map_err(StageError::Ledger)
    }

    /// Write the terminal failure entry, attempt the failure notification,
    /// and hand back the error the caller propagates.
    fn fail(
        &self,
        spec: &StageSpec,
        run_date: NaiveDate,
        start_time: DateTime<Utc>,
        target: NaiveDate,
        detail: String,
    ) -> StageError {
        if let Err(log_err) = self.append(
            spec,
            run_date,
            start_time,
            Some(Utc::now()),
            spec.failure_code,
            RowCounts::none(),
            detail.clone(),
        ) {
            warn!(stage = spec.process_name, error = %log_err, "could not record terminal failure");
        }

        let subject = format!("[ETL] {} FAILED - {}", spec.process_name, ymd(target));
        let body = format!(
            "Process: {}\nDate: {}\nStatus: {} (failure)\nError: {}\n",
            spec.process_name,
            ymd(target),
            spec.failure_code,
            detail
        );
        dispatch(self.notifier, &subject, &body, self.recipients);

        StageError::Execution {
            stage: spec.process_name,
            detail,
        }
    }

    fn notify_success(&self, spec: &StageSpec, target: NaiveDate, counts: &RowCounts, summary: &str) {
        let subject = format!("[ETL] {} success - {}", spec.process_name, ymd(target));
        let body = format!(
            "Process: {}\nDate: {}\nStatus: {} (success)\nExtracted: {}\nLoaded: {}\nTransformed: {}\n{}\n",
            spec.process_name,
            ymd(target),
            spec.success_code,
            display_count(counts.extracted),
            display_count(counts.loaded),
            display_count(counts.transformed),
            summary
        );
        dispatch(self.notifier, &subject, &body, self.recipients);
    }
}

fn display_count(count: Option<i64>) -> String {
    count.map_or_else(|| "-".to_string(), |n| n.to_string())
}
