//! HTTP implementation of [`PriceSource`].
//!
//! The listing site publishes prices as an HTML grid behind a date-range
//! form. [`HttpSource`] submits the form with a blocking client and extracts
//! the first data table from the response. An answer without a data table is
//! reported as [`FetchOutcome::NoData`], matching how the site renders an
//! empty range.

use std::time::Duration;

use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{
    errors::CrawlError,
    source::{FetchOutcome, FetchWindow, PriceSource},
    table::PriceTable,
};

const FROM_FIELD: &str = "from_date";
const TO_FIELD: &str = "to_date";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches price grids from the configured listing URL.
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    /// Build a source against `url` with a request timeout applied.
    pub fn new(url: impl Into<String>) -> Result<Self, CrawlError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl PriceSource for HttpSource {
    fn fetch_window(&self, window: &FetchWindow) -> Result<FetchOutcome, CrawlError> {
        debug!(url = %self.url, from = %window.start_form(), to = %window.end_form(), "fetching price grid");
        let body = self
            .client
            .post(&self.url)
            .form(&[
                (FROM_FIELD, window.start_form()),
                (TO_FIELD, window.end_form()),
            ])
            .send()?
            .error_for_status()?
            .text()?;
        parse_price_grid(&body)
    }
}

/// Extract the first data table from an HTML document.
///
/// Header captions come from the table's `th` cells; every subsequent row
/// contributes its `td` cells. Rows whose cell count disagrees with the
/// header are rejected as a parse error rather than silently padded.
pub fn parse_price_grid(html: &str) -> Result<FetchOutcome, CrawlError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let header_sel = selector("th")?;
    let cell_sel = selector("td")?;

    for table in document.select(&table_sel) {
        let headers: Vec<String> = table.select(&header_sel).map(cell_text).collect();
        if headers.is_empty() {
            continue;
        }

        let mut rows = Vec::new();
        for row in table.select(&row_sel) {
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            if cells.is_empty() {
                continue; // header row
            }
            if cells.len() != headers.len() {
                return Err(CrawlError::Parse(format!(
                    "row has {} cells, header has {}",
                    cells.len(),
                    headers.len()
                )));
            }
            rows.push(cells);
        }

        if rows.is_empty() {
            return Ok(FetchOutcome::NoData);
        }
        return Ok(FetchOutcome::Table(PriceTable { headers, rows }));
    }

    Ok(FetchOutcome::NoData)
}

fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css).map_err(|e| CrawlError::Selector(e.to_string()))
}

fn cell_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
