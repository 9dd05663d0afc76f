//! Target-date parsing and date-derived file naming.

use chrono::NaiveDate;
use price_crawler::source::FetchWindow;

use crate::error::StageError;

/// Date formats accepted on the CLI, tried in order; first parse wins.
pub const ACCEPTED_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Parse an operator-supplied date against [`ACCEPTED_FORMATS`].
pub fn parse_target_date(input: &str) -> Result<NaiveDate, StageError> {
    let trimmed = input.trim();
    for format in ACCEPTED_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(StageError::InvalidDateFormat(input.to_string()))
}

/// Resolve the optional `--date` argument, defaulting to `today`.
pub fn resolve_target_date(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate, StageError> {
    match input {
        Some(raw) => parse_target_date(raw),
        None => Ok(today),
    }
}

/// `YYYY-MM-DD`, the shape used for ledger keys and procedure arguments.
pub fn ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Deterministic name of the staged CSV for a crawl window:
/// `<prefix>_<dd-mm-YYYY>_<dd-mm-YYYY>.csv`.
pub fn staging_file_name(prefix: &str, window: &FetchWindow) -> String {
    format!("{prefix}_{}_{}.csv", window.start_file(), window.end_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_four_formats() {
        let want = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        for input in ["2025-01-05", "05/01/2025", "2025/01/05", "05-01-2025"] {
            assert_eq!(parse_target_date(input).unwrap(), want, "input {input}");
        }
    }

    #[test]
    fn rejects_dotted_dates() {
        let err = parse_target_date("05.01.2025").unwrap_err();
        assert!(matches!(err, StageError::InvalidDateFormat(_)));
    }

    #[test]
    fn first_format_wins_for_ambiguous_input() {
        // 03/04/2025 parses as dd/mm/YYYY, not mm/dd.
        let got = parse_target_date("03/04/2025").unwrap();
        assert_eq!(got, NaiveDate::from_ymd_opt(2025, 4, 3).unwrap());
    }

    #[test]
    fn default_is_today() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(resolve_target_date(None, today).unwrap(), today);
    }

    #[test]
    fn staging_file_name_uses_window_bounds() {
        let window = FetchWindow::week_ending(NaiveDate::from_ymd_opt(2025, 10, 29).unwrap());
        assert_eq!(
            staging_file_name("market_prices", &window),
            "market_prices_22-10-2025_29-10-2025.csv"
        );
    }
}
