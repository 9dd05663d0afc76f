//! In-memory price grid and its CSV rendering.

use std::path::Path;

use crate::errors::CrawlError;

/// A rectangular grid of scraped price data: one header row plus data rows.
///
/// Cells are kept as the site published them; normalization happens later in
/// the transform stage, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    /// Column captions, in document order.
    pub headers: Vec<String>,
    /// Data rows; each row has as many cells as there are headers.
    pub rows: Vec<Vec<String>>,
}

impl PriceTable {
    /// True when the grid carries no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Write the grid to `path` as a headed CSV, returning the data-row count.
    pub fn write_csv(&self, path: &Path) -> Result<u64, CrawlError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(self.rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceTable {
        PriceTable {
            headers: vec!["product".into(), "province".into(), "price".into()],
            rows: vec![
                vec!["cabbage".into(), "Lam Dong".into(), "12000".into()],
                vec!["carrot, baby".into(), "Ha Noi".into(), "18500".into()],
            ],
        }
    }

    #[test]
    fn write_csv_quotes_embedded_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        let written = sample().write_csv(&path).unwrap();
        assert_eq!(written, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("product,province,price"));
        assert_eq!(lines.next(), Some("cabbage,Lam Dong,12000"));
        assert_eq!(lines.next(), Some("\"carrot, baby\",Ha Noi,18500"));
    }
}
