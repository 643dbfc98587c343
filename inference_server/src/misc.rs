use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::predictor::{PredictionResult, SymbolOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeRequest {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResponse {
    pub message: String,
    pub rows: usize,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    pub crypto: String,
    pub trading_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchPredictionRequest {
    pub cryptos: Vec<String>,
    pub trading_days: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SinglePredictionResponse {
    pub crypto: String,
    pub trading_days: u32,
    #[serde(flatten)]
    pub result: PredictionResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub results: Vec<SymbolOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub features: Vec<&'static str>,
    pub trading_days_supported: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_loaded: bool,
    pub data_dir_present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    pub endpoints: BTreeMap<&'static str, Vec<&'static str>>,
}
