use thiserror::Error;

/// The unified error type for the `price_crawler` crate.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The remote site could not be reached or answered with an error status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response document could not be interpreted as a price grid.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A CSS selector failed to compile.
    #[error("Selector error: {0}")]
    Selector(String),

    /// Writing the exported CSV failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error")]
    Csv(#[from] csv::Error),
}
