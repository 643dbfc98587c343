//! Prediction orchestration: one symbol at a time through
//! [`PredictionService`], many symbols through [`BatchPredictor`].

use data_ingestion::DatasetStore;
use feature_processing::loader::load_dataset;
use feature_processing::{FEATURE_NAMES, FeaturePreparer, PreparedFeatures};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::engine::{Classifier, ModelError};
use crate::error::PredictionError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predictions: Vec<i64>,
    pub probabilities: Vec<Vec<f64>>,
    /// Sample dates, one per prediction.
    pub dates: Vec<String>,
}

impl PredictionResult {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// Applies the process-wide classifier to prepared features.
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    preparer: FeaturePreparer,
}

impl PredictionService {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            preparer: FeaturePreparer,
        }
    }

    pub fn predict(&self, features: &PreparedFeatures) -> Result<PredictionResult, ModelError> {
        let found = features.matrix.ncols();
        if found != FEATURE_NAMES.len() {
            return Err(ModelError::FeatureCount {
                expected: FEATURE_NAMES.len(),
                found,
            });
        }
        if features.is_empty() {
            return Ok(PredictionResult::default());
        }

        let output = self.classifier.predict(features.matrix.view())?;
        let rows = features.len();
        if output.labels.len() != rows || output.probabilities.len() != rows {
            return Err(ModelError::Malformed(format!(
                "{} labels and {} probability rows for {} samples",
                output.labels.len(),
                output.probabilities.len(),
                rows
            )));
        }

        Ok(PredictionResult {
            predictions: output.labels,
            probabilities: output.probabilities,
            dates: features
                .dates
                .iter()
                .map(|d| d.format(DATE_FORMAT).to_string())
                .collect(),
        })
    }

    /// Resolves the latest dataset for `symbol`, prepares features for
    /// `horizon_days` and predicts. The horizon is validated before any lookup.
    pub fn predict_symbol(
        &self,
        store: &DatasetStore,
        symbol: &str,
        horizon_days: u32,
    ) -> Result<PredictionResult, PredictionError> {
        if !FeaturePreparer::is_supported(horizon_days) {
            return Err(PredictionError::UnsupportedHorizon(horizon_days));
        }
        let path = store
            .latest(symbol)
            .ok_or_else(|| PredictionError::DataNotFound(symbol.to_string()))?;
        debug!("[{}] Using dataset {}", symbol, path.display());

        let records = load_dataset(&path)?;
        let features = self.preparer.prepare(&records, horizon_days)?;
        if features.is_empty() {
            info!(
                "[{}] Insufficient history ({} records) for a {} day horizon",
                symbol,
                records.len(),
                horizon_days
            );
        }
        Ok(self.predict(&features)?)
    }
}

/// Per-symbol result of a batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SymbolOutcome {
    Success {
        crypto: String,
        trading_days: u32,
        predictions: Vec<i64>,
        probabilities: Vec<Vec<f64>>,
        dates: Vec<String>,
    },
    Error {
        crypto: String,
        tag: &'static str,
        error: String,
    },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Success { crypto, .. } | SymbolOutcome::Error { crypto, .. } => crypto,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SymbolOutcome::Success { .. })
    }
}

pub struct BatchPredictor {
    service: Arc<PredictionService>,
    store: DatasetStore,
}

impl BatchPredictor {
    pub fn new(service: Arc<PredictionService>, store: DatasetStore) -> Self {
        Self { service, store }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn predict_one(
        &self,
        symbol: &str,
        horizon_days: u32,
    ) -> Result<PredictionResult, PredictionError> {
        self.service.predict_symbol(&self.store, symbol, horizon_days)
    }

    /// One outcome per symbol in request order. A failing symbol never stops
    /// the others; only an unsupported horizon rejects the whole batch.
    pub fn run(
        &self,
        symbols: &[String],
        horizon_days: u32,
    ) -> Result<Vec<SymbolOutcome>, PredictionError> {
        if !FeaturePreparer::is_supported(horizon_days) {
            return Err(PredictionError::UnsupportedHorizon(horizon_days));
        }

        let outcomes: Vec<SymbolOutcome> = symbols
            .par_iter()
            .map(|symbol| match self.predict_one(symbol, horizon_days) {
                Ok(result) => SymbolOutcome::Success {
                    crypto: symbol.clone(),
                    trading_days: horizon_days,
                    predictions: result.predictions,
                    probabilities: result.probabilities,
                    dates: result.dates,
                },
                Err(e) => {
                    warn!("[{}] Prediction failed: {}", symbol, e);
                    SymbolOutcome::Error {
                        crypto: symbol.clone(),
                        tag: e.tag(),
                        error: e.to_string(),
                    }
                }
            })
            .collect();

        info!(
            "Batch of {} symbols: {} succeeded",
            outcomes.len(),
            outcomes.iter().filter(|o| o.is_success()).count()
        );
        Ok(outcomes)
    }
}
