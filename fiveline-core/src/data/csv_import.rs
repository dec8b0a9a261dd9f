//! CSV history import.
//!
//! Expected header: `date,open,high,low,close,volume` with an optional
//! `adj_close` column. Dates are ISO `YYYY-MM-DD`. Rows are filtered to the
//! request range, sorted ascending, and duplicate dates keep the first row.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
use super::request::HistoryRequest;
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    adj_close: Option<f64>,
}

impl From<CsvRow> for RawBar {
    fn from(row: CsvRow) -> Self {
        RawBar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.max(0.0).round() as u64,
            adj_close: row.adj_close.unwrap_or(row.close),
        }
    }
}

/// Read every bar from CSV text, sorted ascending with duplicate dates dropped.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<RawBar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| DataError::Csv(format!("row {}: {e}", line + 2)))?;
        bars.push(RawBar::from(row));
    }

    // Stable sort keeps file order among equal dates, so dedup keeps the first.
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

/// History provider backed by a single CSV file.
///
/// The file holds one symbol; the request's symbol is only echoed back.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(&self, request: &HistoryRequest) -> Result<FetchResult, DataError> {
        let file = std::fs::File::open(&self.path)
            .map_err(|e| DataError::Csv(format!("open {}: {e}", self.path.display())))?;
        let bars: Vec<RawBar> = read_bars(file)?
            .into_iter()
            .filter(|b| request.contains(b.date))
            .collect();

        tracing::info!(
            path = %self.path.display(),
            symbol = %request.symbol,
            bars = bars.len(),
            "imported history from CSV"
        );

        Ok(FetchResult {
            symbol: request.symbol.clone(),
            bars,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,open,high,low,close,volume
2024-01-03,101.0,103.0,100.0,102.0,1100
2024-01-02,100.0,102.0,99.0,101.0,1000
2024-01-03,9.0,9.0,9.0,9.0,1
";

    #[test]
    fn reads_sorts_and_dedups() {
        let bars = read_bars(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].close, 102.0);
        assert_eq!(bars[1].adj_close, 102.0);
    }

    #[test]
    fn optional_adj_close_column() {
        let csv = "date,open,high,low,close,volume,adj_close\n2024-01-02,1,2,0.5,1.5,10,1.2\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars[0].adj_close, 1.2);
    }

    #[test]
    fn bad_row_reports_line() {
        let csv = "date,open,high,low,close,volume\n2024-01-02,1,2,0.5,oops,10\n";
        let err = read_bars(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
    }

    #[test]
    fn header_only_is_empty() {
        let bars = read_bars("date,open,high,low,close,volume\n".as_bytes()).unwrap();
        assert!(bars.is_empty());
    }
}
