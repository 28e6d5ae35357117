//! Bar loading from CSV.
//!
//! Expected header: `timestamp,open,high,low,close,volume` with optional
//! `vwap`, `ema_fast` and `ema_slow` columns. Empty indicator cells are read
//! as missing. Rows must be in strictly increasing timestamp order.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognised timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: timestamp {timestamp} is not after the previous row")]
    Unsorted { row: usize, timestamp: NaiveDateTime },

    #[error("no bars in input")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    vwap: Option<f64>,
    #[serde(default)]
    ema_fast: Option<f64>,
    #[serde(default)]
    ema_slow: Option<f64>,
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a bar timestamp. Accepts `YYYY-MM-DD HH:MM[:SS]`, the ISO `T`
/// separator, RFC 3339 with offset (converted to UTC) and bare dates.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Read bars from any CSV source.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars: Vec<Bar> = Vec::new();

    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        // Row numbers are 1-based and skip the header line.
        let row = i + 2;
        let rec = record?;
        let timestamp = parse_timestamp(&rec.timestamp).ok_or_else(|| DataError::Timestamp {
            row,
            value: rec.timestamp.clone(),
        })?;
        if let Some(last) = bars.last() {
            if timestamp <= last.timestamp {
                return Err(DataError::Unsorted { row, timestamp });
            }
        }

        let bar = Bar {
            timestamp,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close: rec.close,
            volume: rec.volume,
            vwap: rec.vwap,
            ema_fast: rec.ema_fast,
            ema_slow: rec.ema_slow,
        };
        if !bar.is_sane() {
            tracing::warn!(row, timestamp = %timestamp, "bar fails OHLC sanity check");
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(DataError::Empty);
    }
    Ok(bars)
}

/// Load bars from a CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = std::fs::File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let bars = read_csv(std::io::BufReader::new(file))?;
    tracing::debug!(path = %path.display(), bars = bars.len(), "bars loaded");
    Ok(bars)
}

/// Symbol name for a data file: its file stem, upper-cased (`spy.csv` → `SPY`).
pub fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
