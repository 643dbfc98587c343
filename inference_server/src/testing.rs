//! Test doubles shared by the predictor and server tests.

use chrono::{Duration, NaiveDate};
use data_ingestion::DatasetStore;
use ndarray::ArrayView2;
use std::path::{Path, PathBuf};

use crate::engine::{Classifier, ClassifierOutput, ModelError};

/// Calls a sample "up" when its RSI column is above 50.
pub struct StubClassifier;

impl Classifier for StubClassifier {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, ModelError> {
        let mut labels = Vec::with_capacity(features.nrows());
        let mut probabilities = Vec::with_capacity(features.nrows());
        for row in features.rows() {
            let up = (row[0] / 100.0).clamp(0.0, 1.0);
            labels.push(if up > 0.5 { 1 } else { -1 });
            probabilities.push(vec![1.0 - up, up]);
        }
        Ok(ClassifierOutput {
            labels,
            probabilities,
        })
    }
}

/// Writes `days` of synthetic daily history for `symbol`, newest row first as
/// the scraped tables are.
pub fn write_history(dir: &Path, symbol: &str, days: usize) -> PathBuf {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut lines = vec!["Date,Open*,High,Low,Close**,Volume,Cryptocurrency".to_string()];
    for i in (0..days).rev() {
        let t = i as f64;
        let close = 100.0 + 10.0 * (t * 0.3).sin() + t * 0.05;
        let date = start + Duration::days(i as i64);
        lines.push(format!(
            "\"{}\",\"${:.2}\",\"${:.2}\",\"${:.2}\",\"${:.2}\",\"${:.0}\",{}",
            date.format("%b %d, %Y"),
            close - 0.5,
            close + 2.0,
            close - 2.0,
            close,
            1_000_000.0 + t * 1_000.0,
            symbol
        ));
    }

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let path = DatasetStore::new(dir).path_for(symbol, date).unwrap();
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}
