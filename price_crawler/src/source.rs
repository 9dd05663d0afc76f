//! Source abstraction for price listings.
//!
//! [`PriceSource`] is the seam between the pipeline and whatever actually
//! produces the price grid. The production implementation is
//! [`crate::http::HttpSource`]; tests substitute their own. The trait is
//! object-safe so callers can hold a `Box<dyn PriceSource>` chosen at runtime.

use chrono::{Days, NaiveDate};

use crate::{errors::CrawlError, table::PriceTable};

/// Number of days of history fetched per crawl, ending at the target date.
pub const WINDOW_DAYS: u64 = 7;

/// The inclusive date range a fetch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window (the pipeline's target date).
    pub end: NaiveDate,
}

impl FetchWindow {
    /// Standard crawl window: [`WINDOW_DAYS`] days ending at `end`.
    pub fn week_ending(end: NaiveDate) -> Self {
        let start = end.checked_sub_days(Days::new(WINDOW_DAYS)).unwrap_or(end);
        Self { start, end }
    }

    /// Window start as the `dd/mm/YYYY` form the listing site expects.
    pub fn start_form(&self) -> String {
        self.start.format("%d/%m/%Y").to_string()
    }

    /// Window end as the `dd/mm/YYYY` form the listing site expects.
    pub fn end_form(&self) -> String {
        self.end.format("%d/%m/%Y").to_string()
    }

    /// Window start in the `dd-mm-YYYY` shape used in file names.
    pub fn start_file(&self) -> String {
        self.start.format("%d-%m-%Y").to_string()
    }

    /// Window end in the `dd-mm-YYYY` shape used in file names.
    pub fn end_file(&self) -> String {
        self.end.format("%d-%m-%Y").to_string()
    }
}

/// What a fetch produced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The site published rows for the window.
    Table(PriceTable),
    /// The site had nothing for the window. Not an error.
    NoData,
}

/// A provider of market price grids.
pub trait PriceSource {
    /// Fetch the published prices for `window`.
    ///
    /// Implementations must map "the site has no rows for this range" to
    /// [`FetchOutcome::NoData`] rather than an error, so the pipeline can
    /// record a no-data skip instead of a failure.
    fn fetch_window(&self, window: &FetchWindow) -> Result<FetchOutcome, CrawlError>;
}
