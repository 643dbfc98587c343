//! OHLCV view over a persisted dataset file.

use chrono::NaiveDate;
use csv::{Reader, StringRecord};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::error::FeatureError;
use crate::misc::OhlcvRecord;

const DATE_FORMATS: [&str; 4] = ["%b %d, %Y", "%B %d, %Y", "%Y-%m-%d", "%d/%m/%Y"];

/// Loads the records of a dataset file, oldest first, one per date.
pub fn load_dataset(path: &Path) -> Result<Vec<OhlcvRecord>, FeatureError> {
    debug!("Loading dataset {}", path.display());
    read_records(Reader::from_path(path)?)
}

pub fn read_records<R: Read>(mut reader: Reader<R>) -> Result<Vec<OhlcvRecord>, FeatureError> {
    let columns = Columns::locate(reader.headers()?)?;

    // keyed by date: sorts ascending and keeps the last row seen per date
    let mut by_date = BTreeMap::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        match columns.parse(&record?) {
            Some(r) => {
                by_date.insert(r.date, r);
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unparsable rows", skipped);
    }
    Ok(by_date.into_values().collect())
}

/// Positions of the OHLCV columns in a dataset header.
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, FeatureError> {
        let names: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |wanted: &str| {
            names
                .iter()
                .position(|n| n == wanted)
                .ok_or_else(|| FeatureError::MissingColumn(wanted.to_string()))
        };

        Ok(Self {
            date: find("date")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }

    fn parse(&self, record: &StringRecord) -> Option<OhlcvRecord> {
        let number = |idx: usize| record.get(idx).and_then(parse_number);
        Some(OhlcvRecord {
            date: record.get(self.date).and_then(parse_date)?,
            open: number(self.open)?,
            high: number(self.high)?,
            low: number(self.low)?,
            close: number(self.close)?,
            volume: number(self.volume)?,
        })
    }
}

/// `"Close**"` → `"close"`.
fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Accepts currency symbols and thousands separators, e.g. `"$67,123.45"`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
