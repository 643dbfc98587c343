use thiserror::Error;

use crate::processor::SUPPORTED_HORIZONS;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error(
        "unsupported horizon {0} days, expected one of {supported:?}",
        supported = SUPPORTED_HORIZONS
    )]
    UnsupportedHorizon(u32),

    #[error("dataset has no {0} column")]
    MissingColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
