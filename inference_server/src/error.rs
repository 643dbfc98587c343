use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use feature_processing::FeatureError;
use serde::Serialize;
use thiserror::Error;

use crate::engine::ModelError;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("no data found for {0}")]
    DataNotFound(String),

    #[error("unsupported horizon {0} days")]
    UnsupportedHorizon(u32),

    #[error("dataset error: {0}")]
    Dataset(FeatureError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl From<FeatureError> for PredictionError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::UnsupportedHorizon(h) => PredictionError::UnsupportedHorizon(h),
            other => PredictionError::Dataset(other),
        }
    }
}

impl PredictionError {
    pub fn tag(&self) -> &'static str {
        match self {
            PredictionError::DataNotFound(_) => "not_found",
            PredictionError::UnsupportedHorizon(_) => "unsupported_horizon",
            PredictionError::Dataset(_) => "dataset_error",
            PredictionError::Model(_) => "model_error",
        }
    }
}

/// Error surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("connection error: {0}")]
    ScrapeNetwork(String),

    #[error("scraping error: {0}")]
    ScrapeFailed(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub detail: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INPUT"),
            ApiError::ScrapeNetwork(_) => (StatusCode::INTERNAL_SERVER_ERROR, "NETWORK_ERROR"),
            ApiError::ScrapeFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SCRAPING_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::DataNotFound(_) => ApiError::NotFound(err.to_string()),
            PredictionError::UnsupportedHorizon(_) => ApiError::InvalidInput(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorResponse {
            code,
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
