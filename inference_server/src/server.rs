use anyhow::Result;
use async_trait::async_trait;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use data_ingestion::{
    DatasetStore, FailureTag, JobOutcome, Launcher, ScrapeError, ScrapeOrchestrator, ScrapeTarget,
};
use feature_processing::{FEATURE_NAMES, SUPPORTED_HORIZONS};
use log::{error, info};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::misc::{
    BatchPredictionRequest, BatchResponse, HealthResponse, IndexResponse, ModelInfo,
    PredictionRequest, ScrapeRequest, ScrapeResponse, SinglePredictionResponse,
};
use crate::predictor::BatchPredictor;

/// Runs one scrape on demand.
#[async_trait]
pub trait ScrapeTrigger: Send + Sync {
    async fn scrape(&self, target: ScrapeTarget) -> Result<JobOutcome, ScrapeError>;
}

#[async_trait]
impl<L> ScrapeTrigger for ScrapeOrchestrator<L>
where
    L: Launcher + 'static,
{
    async fn scrape(&self, target: ScrapeTarget) -> Result<JobOutcome, ScrapeError> {
        self.scrape_one(&target).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<BatchPredictor>,
    pub scraper: Arc<dyn ScrapeTrigger>,
    pub model_type: String,
}

async fn index() -> Json<IndexResponse> {
    let mut endpoints = BTreeMap::new();
    endpoints.insert("get", vec!["/", "/health", "/model/info"]);
    endpoints.insert("post", vec!["/scrape", "/predict/single", "/predict/batch"]);
    Json(IndexResponse {
        message: "Crypto scraping and prediction API",
        endpoints,
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        version: env!("CARGO_PKG_VERSION"),
        model_loaded: true,
        data_dir_present: state.predictor.store().dir().is_dir(),
    })
}

async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(ModelInfo {
        model_type: state.model_type.clone(),
        features: FEATURE_NAMES.to_vec(),
        trading_days_supported: SUPPORTED_HORIZONS.to_vec(),
    })
}

/// POST /scrape scrapes one page on a dedicated browser session. The scrape
/// runs as its own task so a dropped request cannot abandon the session.
async fn scrape(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    if !DatasetStore::is_valid_symbol(&req.name) {
        return Err(ApiError::InvalidInput(format!(
            "invalid symbol {:?}, expected letters, digits, '_' or '-'",
            req.name
        )));
    }
    info!("[{}] Scrape requested for {}", req.name, req.url);
    let target = ScrapeTarget::new(req.name.clone(), req.url);

    let scraper = state.scraper.clone();
    let result = tokio::spawn(async move { scraper.scrape(target).await })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(outcome) if outcome.is_success() => Ok(Json(ScrapeResponse {
            message: format!("{} data scraped successfully", req.name),
            rows: outcome.rows,
            path: outcome.path,
        })),
        Ok(outcome) => {
            let detail = outcome
                .detail
                .unwrap_or_else(|| format!("scrape failed for {}", req.name));
            match outcome.tag {
                Some(FailureTag::NetworkError) => Err(ApiError::ScrapeNetwork(detail)),
                _ => Err(ApiError::ScrapeFailed(detail)),
            }
        }
        Err(e) => {
            error!("[{}] Scrape escaped with {}", req.name, e);
            if e.is_network() {
                Err(ApiError::ScrapeNetwork(e.to_string()))
            } else {
                Err(ApiError::ScrapeFailed(e.to_string()))
            }
        }
    }
}

async fn predict_single(
    State(state): State<AppState>,
    Json(req): Json<PredictionRequest>,
) -> Result<Json<SinglePredictionResponse>, ApiError> {
    let predictor = state.predictor.clone();
    let symbol = req.crypto.clone();
    let horizon = req.trading_days;
    let result = tokio::task::spawn_blocking(move || predictor.predict_one(&symbol, horizon))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(SinglePredictionResponse {
        crypto: req.crypto,
        trading_days: req.trading_days,
        result,
    }))
}

async fn predict_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchPredictionRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let predictor = state.predictor.clone();
    let cryptos = req.cryptos;
    let horizon = req.trading_days;
    let results = tokio::task::spawn_blocking(move || predictor.run(&cryptos, horizon))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(BatchResponse { results }))
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/health", get(health))
            .route("/model/info", get(model_info))
            .route("/scrape", post(scrape))
            .route("/predict/single", post(predict_single))
            .route("/predict/batch", post(predict_batch))
            .with_state(self.state.clone())
    }

    pub async fn run(&self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("HTTP server running on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
