//! Flat CSV storage for scraped tables, one file per symbol per calendar day.

use chrono::NaiveDate;
use log::info;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::ScrapeError;
use crate::extract::RawTable;

/// Column appended to every persisted table, holding the symbol.
pub const SYMBOL_COLUMN: &str = "Cryptocurrency";

const DATE_STAMP: &str = "%Y%m%d";

#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(symbol: &str, date: NaiveDate) -> String {
        format!("{}_data_{}.csv", symbol, date.format(DATE_STAMP))
    }

    /// Symbols become file names, so only `[A-Za-z0-9_-]+` is accepted.
    pub fn is_valid_symbol(symbol: &str) -> bool {
        !symbol.is_empty()
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    pub fn path_for(&self, symbol: &str, date: NaiveDate) -> Result<PathBuf, ScrapeError> {
        if !Self::is_valid_symbol(symbol) {
            return Err(ScrapeError::Persistence(format!("invalid symbol {symbol:?}")));
        }
        Ok(self.dir.join(Self::file_name(symbol, date)))
    }

    /// Writes `table` as the dataset for (`symbol`, `date`), replacing any file
    /// written earlier the same day. The table is staged in a uniquely named
    /// temporary file in the same directory and renamed into place; the staging
    /// file is removed on any failure.
    pub fn save(
        &self,
        symbol: &str,
        date: NaiveDate,
        table: &RawTable,
    ) -> Result<PathBuf, ScrapeError> {
        let path = self.path_for(symbol, date)?;
        fs::create_dir_all(&self.dir)?;

        let staging = NamedTempFile::new_in(&self.dir)?;
        write_csv(staging.as_file(), symbol, table)?;
        staging.persist(&path).map_err(|e| e.error)?;

        info!("[{}] Data saved to {}", symbol, path.display());
        Ok(path)
    }

    /// Most recent dataset written for `symbol`, if any.
    pub fn latest(&self, symbol: &str) -> Option<PathBuf> {
        if !Self::is_valid_symbol(symbol) {
            return None;
        }
        let prefix = format!("{symbol}_data_");
        let entries = fs::read_dir(&self.dir).ok()?;

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stamp = name.strip_prefix(&prefix)?.strip_suffix(".csv")?;
                let date = NaiveDate::parse_from_str(stamp, DATE_STAMP).ok()?;
                Some((date, entry.path()))
            })
            .max_by_key(|(date, _)| *date)
            .map(|(_, path)| path)
    }
}

fn write_csv(file: &File, symbol: &str, table: &RawTable) -> Result<(), ScrapeError> {
    let mut writer = csv::Writer::from_writer(file);

    let mut header: Vec<&str> = table.header().iter().map(String::as_str).collect();
    header.push(SYMBOL_COLUMN);
    writer.write_record(&header)?;

    for row in table.rows() {
        let mut record: Vec<&str> = row.iter().map(String::as_str).collect();
        record.push(symbol);
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> RawTable {
        let header = vec!["Date".to_string(), "Close".to_string()];
        let rows = (0..rows)
            .map(|i| vec![format!("Oct {}, 2024", i + 1), format!("${}.00", i)])
            .collect();
        RawTable::new(header, rows).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    #[test]
    fn file_name_follows_symbol_and_day() {
        assert_eq!(DatasetStore::file_name("BTC", day(5)), "BTC_data_20241005.csv");
    }

    #[test]
    fn saved_file_carries_symbol_column() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        let path = store.save("ETH", day(1), &table(2)).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Date,Close,Cryptocurrency"));
        assert_eq!(lines.next(), Some("\"Oct 1, 2024\",$0.00,ETH"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn same_day_rescrape_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        store.save("BTC", day(1), &table(5)).unwrap();
        let path = store.save("BTC", day(1), &table(3)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 3);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn latest_picks_most_recent_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        store.save("BTC", day(3), &table(1)).unwrap();
        store.save("BTC", day(9), &table(1)).unwrap();
        store.save("BTCX", day(20), &table(1)).unwrap();

        let latest = store.latest("BTC").unwrap();
        assert!(latest.ends_with("BTC_data_20241009.csv"));
        assert!(store.latest("SOL").is_none());
    }

    #[test]
    fn symbols_outside_the_data_dir_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(root.path().join("data"));

        for symbol in ["../escaped", "a/b", "", "BTC.csv"] {
            let err = store.save(symbol, day(1), &table(1)).unwrap_err();
            assert!(matches!(err, ScrapeError::Persistence(_)), "{symbol:?}");
            assert!(store.latest(symbol).is_none());
        }
        assert!(!root.path().join("escaped_data_20241001.csv").exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
        assert!(DatasetStore::is_valid_symbol("BTC-USD_2"));
    }

    #[test]
    fn concurrent_saves_of_one_symbol_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || {
                        for _ in 0..10 {
                            store.save("BTC", day(1), &table(3 + i)).unwrap();
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
        });

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["BTC_data_20241001.csv"]);
        let mut reader = csv::Reader::from_path(dir.path().join("BTC_data_20241001.csv")).unwrap();
        let rows = reader.records().count();
        assert!((3..7).contains(&rows));
    }

    #[test]
    fn latest_on_missing_directory_is_none() {
        let store = DatasetStore::new("/nonexistent/datasets");
        assert!(store.latest("BTC").is_none());
    }
}
