use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One period of market history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Feature columns in the order the classifier was trained on.
pub const FEATURE_NAMES: [&str; 6] = [
    "RSI",
    "StochasticOscillator",
    "Williams",
    "MACD",
    "PROC",
    "OBV",
];
