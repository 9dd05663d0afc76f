//! The stage-boundary error taxonomy.
//!
//! Every way a stage invocation can stop short of a normal outcome is a
//! variant here, so callers (and the CLI exit code) never have to infer the
//! class of a failure from message text:
//!
//! - configuration problems ([`StageError::InvalidDateFormat`],
//!   [`StageError::MissingParameter`]) surface before any ledger write;
//! - [`StageError::UpstreamNotReady`] is recoverable by re-invocation and
//!   leaves no ledger row; absence means "never attempted";
//! - [`StageError::Execution`] corresponds to a logged terminal failure row
//!   and a non-zero process exit.

use chrono::NaiveDate;
use thiserror::Error;

/// Why a stage invocation did not complete.
#[derive(Debug, Error)]
pub enum StageError {
    /// The `--date` argument matched none of the accepted formats.
    #[error(
        "unrecognized date '{0}' (accepted: YYYY-MM-DD, dd/mm/YYYY, YYYY/mm/dd, dd-mm-YYYY)"
    )]
    InvalidDateFormat(String),

    /// A required parameter is absent from the control store.
    #[error("required parameter '{0}' is missing from the control store")]
    MissingParameter(String),

    /// The upstream stage has not succeeded for the resolved log date.
    #[error("upstream '{upstream}' not ready for {log_date} (status: {status})")]
    UpstreamNotReady {
        /// Process name of the gating upstream stage.
        upstream: &'static str,
        /// The log date the gate was evaluated for.
        log_date: NaiveDate,
        /// The status found, or `absent` when no row exists.
        status: String,
    },

    /// The control store itself could not be read or written.
    #[error("control store error: {0:#}")]
    Ledger(#[source] anyhow::Error),

    /// The stage body failed; a terminal failure row has been written.
    #[error("stage '{stage}' failed: {detail}")]
    Execution {
        /// Process name of the failing stage.
        stage: &'static str,
        /// Captured failure detail (also recorded in the ledger).
        detail: String,
    },
}
