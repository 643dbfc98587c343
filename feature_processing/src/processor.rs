use chrono::NaiveDate;
use log::debug;
use ndarray::Array2;

use crate::error::FeatureError;
use crate::indicators::{
    MACD_FAST, MACD_SLOW, MIN_LOOKBACK, PROC_PERIOD, RSI_PERIOD, STOCHASTIC_PERIOD,
    WILLIAMS_PERIOD, macd, on_balance_volume, price_rate_of_change, rsi, stochastic_k, williams_r,
};
use crate::misc::{FEATURE_NAMES, OhlcvRecord};

/// Horizons, in trading days, the classifier was trained for.
pub const SUPPORTED_HORIZONS: [u32; 8] = [3, 5, 10, 15, 30, 60, 90, 120];

pub const LABEL_UP: i64 = 1;
pub const LABEL_DOWN: i64 = -1;

/// Feature rows with their labels, dates and closes, aligned by index.
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    /// One row per sample, columns in [`FEATURE_NAMES`] order.
    pub matrix: Array2<f64>,
    /// Direction of the close `horizon` days after each sample.
    pub labels: Vec<i64>,
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
}

impl PreparedFeatures {
    fn empty() -> Self {
        Self {
            matrix: Array2::zeros((0, FEATURE_NAMES.len())),
            labels: Vec::new(),
            dates: Vec::new(),
            closes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    /// Not enough history for any labelled sample.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeaturePreparer;

impl FeaturePreparer {
    pub fn is_supported(horizon_days: u32) -> bool {
        SUPPORTED_HORIZONS.contains(&horizon_days)
    }

    /// Builds the feature matrix for `records` (oldest first). Samples whose
    /// horizon would run past the last record are left out. Too little history
    /// gives an empty result rather than an error.
    pub fn prepare(
        &self,
        records: &[OhlcvRecord],
        horizon_days: u32,
    ) -> Result<PreparedFeatures, FeatureError> {
        if !Self::is_supported(horizon_days) {
            return Err(FeatureError::UnsupportedHorizon(horizon_days));
        }

        let n = records.len();
        if n < MIN_LOOKBACK {
            debug!("{} records, need at least {}", n, MIN_LOOKBACK);
            return Ok(PreparedFeatures::empty());
        }

        let high: Vec<f64> = records.iter().map(|r| r.high).collect();
        let low: Vec<f64> = records.iter().map(|r| r.low).collect();
        let close: Vec<f64> = records.iter().map(|r| r.close).collect();
        let volume: Vec<f64> = records.iter().map(|r| r.volume).collect();

        // same order as FEATURE_NAMES
        let columns = [
            rsi(&close, RSI_PERIOD),
            stochastic_k(&high, &low, &close, STOCHASTIC_PERIOD),
            williams_r(&high, &low, &close, WILLIAMS_PERIOD),
            macd(&close, MACD_FAST, MACD_SLOW),
            price_rate_of_change(&close, PROC_PERIOD),
            on_balance_volume(&close, &volume),
        ];

        let horizon = horizon_days as usize;
        let samples: Vec<usize> = ((MIN_LOOKBACK - 1)..n)
            .take_while(|i| i + horizon < n)
            .filter(|&i| columns.iter().all(|c| c[i].is_finite()))
            .collect();

        let mut matrix = Array2::zeros((samples.len(), FEATURE_NAMES.len()));
        for (row, &i) in samples.iter().enumerate() {
            for (col, values) in columns.iter().enumerate() {
                matrix[[row, col]] = values[i];
            }
        }

        let labels = samples
            .iter()
            .map(|&i| {
                if close[i + horizon] > close[i] {
                    LABEL_UP
                } else {
                    LABEL_DOWN
                }
            })
            .collect();

        Ok(PreparedFeatures {
            matrix,
            labels,
            dates: samples.iter().map(|&i| records[i].date).collect(),
            closes: samples.iter().map(|&i| close[i]).collect(),
        })
    }
}
