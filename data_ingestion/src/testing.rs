//! In-memory page driver and launcher used by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::browser::{Launcher, PageDriver, TableCells};
use crate::error::{DriverError, ScrapeError};

#[derive(Default)]
pub struct ScriptedPage {
    pub navigation_failures: HashMap<String, DriverError>,
    pub body_error: Option<DriverError>,
    /// Results of successive consent clicks; exhausted means no banner.
    pub consent_results: VecDeque<Result<(), DriverError>>,
    pub consent_calls: usize,
    pub tables: HashMap<String, Result<TableCells, DriverError>>,
    pub visited: Vec<String>,
    current_url: String,
    quits: Option<Arc<AtomicUsize>>,
}

impl ScriptedPage {
    pub fn with_table(mut self, url: &str, table: TableCells) -> Self {
        self.tables.insert(url.to_string(), Ok(table));
        self
    }

    pub fn with_table_error(mut self, url: &str, err: DriverError) -> Self {
        self.tables.insert(url.to_string(), Err(err));
        self
    }

    pub fn with_navigation_failure(mut self, url: &str, err: DriverError) -> Self {
        self.navigation_failures.insert(url.to_string(), err);
        self
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.visited.push(url.to_string());
        if let Some(err) = self.navigation_failures.get(url) {
            return Err(err.clone());
        }
        self.current_url = url.to_string();
        Ok(())
    }

    async fn wait_for_css(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        match &self.body_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn click_when_clickable(
        &mut self,
        id: &str,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        self.consent_calls += 1;
        self.consent_results
            .pop_front()
            .unwrap_or_else(|| Err(DriverError::Timeout(id.to_string())))
    }

    async fn read_table(&mut self, _timeout: Duration) -> Result<TableCells, DriverError> {
        self.tables
            .get(&self.current_url)
            .cloned()
            .unwrap_or_else(|| Err(DriverError::Timeout("table".to_string())))
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        if let Some(quits) = &self.quits {
            quits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Hands out queued pages and counts launches and releases.
pub struct ScriptedLauncher {
    pages: Mutex<VecDeque<ScriptedPage>>,
    launched: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            launched: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    type Page = ScriptedPage;

    async fn launch(&self) -> Result<ScriptedPage, ScrapeError> {
        let next = self.pages.lock().unwrap().pop_front();
        match next {
            Some(mut page) => {
                self.launched.fetch_add(1, Ordering::SeqCst);
                page.quits = Some(self.released.clone());
                Ok(page)
            }
            None => Err(ScrapeError::SessionAcquisition("browser binary not found".into())),
        }
    }
}

pub fn table(header: &[&str], rows: &[&[&str]]) -> TableCells {
    TableCells {
        header: header.iter().map(|s| s.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    }
}
