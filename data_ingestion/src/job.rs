//! One scrape of one (symbol, url) pair against a live page.
//!
//! The job walks `Navigating → Synchronizing → ConsentCheck → Extracting →
//! Persisting` and ends in `Succeeded` or `Failed`. Modeled failures become a
//! tagged [`JobOutcome`]; anything else is returned as an error so the caller
//! can treat the browser session as compromised.

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::PageDriver;
use crate::config::ScraperConfig;
use crate::consent::ConsentHandler;
use crate::error::{DriverError, FailureTag, ScrapeError};
use crate::extract::TableExtractor;
use crate::pacing::Pacer;
use crate::persist::DatasetStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTarget {
    pub symbol: String,
    pub source_url: String,
}

impl ScrapeTarget {
    pub fn new(symbol: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            source_url: source_url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Navigating,
    Synchronizing,
    ConsentCheck,
    Extracting,
    Persisting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub symbol: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<FailureTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub rows: usize,
    /// State the job was in when it ended.
    pub last_state: JobState,
}

impl JobOutcome {
    fn succeeded(symbol: &str, path: PathBuf, rows: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            status: JobStatus::Succeeded,
            tag: None,
            detail: None,
            path: Some(path),
            rows,
            last_state: JobState::Succeeded,
        }
    }

    fn failed(symbol: &str, state: JobState, tag: FailureTag, err: &ScrapeError) -> Self {
        Self {
            symbol: symbol.to_string(),
            status: JobStatus::Failed,
            tag: Some(tag),
            detail: Some(err.to_string()),
            path: None,
            rows: 0,
            last_state: state,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

pub struct ScrapeJob {
    consent: ConsentHandler,
    consent_wait: Duration,
    extractor: TableExtractor,
    page_load_timeout: Duration,
    table_timeout: Duration,
    store: DatasetStore,
    pacer: Pacer,
}

impl ScrapeJob {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            consent: ConsentHandler::from(&config.consent),
            consent_wait: config.consent.wait(),
            extractor: TableExtractor,
            page_load_timeout: config.extraction.page_load_timeout(),
            table_timeout: config.extraction.table_timeout(),
            store: DatasetStore::new(config.data_dir.clone()),
            pacer: Pacer::from(&config.pacing),
        }
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Runs the job, stamping the dataset with today's local date.
    pub async fn run<P>(
        &self,
        page: &mut P,
        target: &ScrapeTarget,
    ) -> Result<JobOutcome, ScrapeError>
    where
        P: PageDriver + ?Sized,
    {
        self.run_on(page, target, Local::now().date_naive()).await
    }

    pub async fn run_on<P>(
        &self,
        page: &mut P,
        target: &ScrapeTarget,
        date: NaiveDate,
    ) -> Result<JobOutcome, ScrapeError>
    where
        P: PageDriver + ?Sized,
    {
        let symbol = target.symbol.as_str();
        info!("[{}] Starting scrape of {}", symbol, target.source_url);

        let mut state = JobState::Navigating;
        match self.drive(page, target, date, &mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => match err.tag() {
                Some(tag) => {
                    warn!("[{}] Failed while {:?} ({}): {}", symbol, state, tag, err);
                    Ok(JobOutcome::failed(symbol, state, tag, &err))
                }
                None => Err(err),
            },
        }
    }

    async fn drive<P>(
        &self,
        page: &mut P,
        target: &ScrapeTarget,
        date: NaiveDate,
        state: &mut JobState,
    ) -> Result<JobOutcome, ScrapeError>
    where
        P: PageDriver + ?Sized,
    {
        let symbol = target.symbol.as_str();

        page.goto(&target.source_url).await.map_err(|e| match e {
            DriverError::SessionLost(msg) => ScrapeError::Unexpected(msg),
            other => ScrapeError::Network(other.to_string()),
        })?;
        self.pacer.pause().await;

        *state = JobState::Synchronizing;
        page.wait_for_css("body", self.page_load_timeout)
            .await
            .map_err(|e| match e {
                DriverError::Timeout(_) | DriverError::NoSuchElement(_) => {
                    ScrapeError::SynchronizationTimeout(self.page_load_timeout)
                }
                other => ScrapeError::Unexpected(other.to_string()),
            })?;

        *state = JobState::ConsentCheck;
        let accepted = self
            .consent
            .dismiss(page, self.consent_wait)
            .await
            .map_err(|e| ScrapeError::Unexpected(e.to_string()))?;
        if !accepted {
            debug!("[{}] No cookie banner dismissed", symbol);
        }
        self.pacer.pause().await;

        *state = JobState::Extracting;
        let table = self.extractor.extract(page, self.table_timeout).await?;
        info!("[{}] Extracted {} rows", symbol, table.len());

        *state = JobState::Persisting;
        let path = self.store.save(symbol, date, &table)?;

        *state = JobState::Succeeded;
        Ok(JobOutcome::succeeded(symbol, path, table.len()))
    }
}
