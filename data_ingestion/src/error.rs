use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failures a page driver reports back to the scrape pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("webdriver protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("page not ready after {0:?}")]
    SynchronizationTimeout(Duration),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("failed to acquire browser session: {0}")]
    SessionAcquisition(String),

    #[error("scrape run abandoned after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Job-level failure categories recorded in a scrape outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureTag {
    NetworkError,
    SynchronizationTimeout,
    ExtractionError,
    PersistenceError,
}

impl FailureTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureTag::NetworkError => "NetworkError",
            FailureTag::SynchronizationTimeout => "SynchronizationTimeout",
            FailureTag::ExtractionError => "ExtractionError",
            FailureTag::PersistenceError => "PersistenceError",
        }
    }
}

impl fmt::Display for FailureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScrapeError {
    /// Tag for failures that end a single job. `None` means the error is not a
    /// modeled job failure and must escalate past the job.
    pub fn tag(&self) -> Option<FailureTag> {
        match self {
            ScrapeError::Network(_) => Some(FailureTag::NetworkError),
            ScrapeError::SynchronizationTimeout(_) => Some(FailureTag::SynchronizationTimeout),
            ScrapeError::Extraction(_) => Some(FailureTag::ExtractionError),
            ScrapeError::Persistence(_) => Some(FailureTag::PersistenceError),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ScrapeError::Network(_))
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(e: std::io::Error) -> Self {
        ScrapeError::Persistence(e.to_string())
    }
}

impl From<csv::Error> for ScrapeError {
    fn from(e: csv::Error) -> Self {
        ScrapeError::Persistence(e.to_string())
    }
}
