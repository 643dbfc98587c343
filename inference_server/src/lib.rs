pub mod config;
pub mod engine;
pub mod error;
pub mod misc;
pub mod predictor;
pub mod server;

#[cfg(test)]
mod testing;

pub use config::{ModelConfig, ServerConfig};
pub use engine::{Classifier, ClassifierOutput, ModelError, OnnxClassifier};
pub use error::{ApiError, PredictionError};
pub use predictor::{BatchPredictor, PredictionResult, PredictionService, SymbolOutcome};
pub use server::{AppState, ScrapeTrigger, Server};
