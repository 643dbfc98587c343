//! Browser automation seam for the scrape pipeline.
//!
//! [`PageDriver`] is the narrow set of page operations the pipeline needs and
//! [`Launcher`] produces live drivers. [`ChromeLauncher`] drives Chrome through
//! a WebDriver endpoint with a reduced automation footprint. [`BrowserSession`]
//! owns one driver and is released by consuming it, so a session cannot be
//! released twice. A session dropped without release (a cancelled scrape)
//! quits its page on the current tokio runtime.

use async_trait::async_trait;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder, Locator};
use log::{debug, info, warn};
use serde_json::{Map, Value, json};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::time::sleep;

use crate::config::BrowserConfig;
use crate::error::{DriverError, ScrapeError};

const CLICKABLE_POLL: Duration = Duration::from_millis(100);

/// Raw text of the first table on a page, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCells {
    /// Text of every `th` cell.
    pub header: Vec<String>,
    /// `td` texts of every `tr`, the header row included.
    pub rows: Vec<Vec<String>>,
}

#[async_trait]
pub trait PageDriver: Send + 'static {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    /// Blocks until an element matching `selector` exists or `timeout` elapses.
    async fn wait_for_css(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Waits for the element with `id` to be displayed and enabled, then clicks it.
    async fn click_when_clickable(&mut self, id: &str, timeout: Duration)
    -> Result<(), DriverError>;

    async fn read_table(&mut self, timeout: Duration) -> Result<TableCells, DriverError>;

    async fn quit(&mut self) -> Result<(), DriverError>;
}

#[async_trait]
pub trait Launcher: Send + Sync {
    type Page: PageDriver;

    /// Failure here is fatal for the caller and is never retried at this layer.
    async fn launch(&self) -> Result<Self::Page, ScrapeError>;
}

/// One live browser handle shared by consecutive scrape jobs.
pub struct BrowserSession<P: PageDriver> {
    // None once released
    page: Option<P>,
}

impl<P: PageDriver> BrowserSession<P> {
    pub async fn acquire<L>(launcher: &L) -> Result<Self, ScrapeError>
    where
        L: Launcher<Page = P>,
    {
        let page = launcher.launch().await?;
        debug!("Browser session acquired");
        Ok(Self { page: Some(page) })
    }

    pub fn page(&mut self) -> Result<&mut P, ScrapeError> {
        self.page
            .as_mut()
            .ok_or_else(|| ScrapeError::Unexpected("browser session already released".into()))
    }

    pub async fn release(mut self) {
        if let Some(mut page) = self.page.take() {
            quit_page(&mut page).await;
            debug!("Browser session released");
        }
    }
}

async fn quit_page<P: PageDriver>(page: &mut P) {
    if let Err(e) = page.quit().await {
        warn!("Browser session did not shut down cleanly: {}", e);
    }
}

impl<P: PageDriver> Drop for BrowserSession<P> {
    fn drop(&mut self) {
        let Some(mut page) = self.page.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                warn!("Browser session dropped without release, quitting in background");
                handle.spawn(async move { quit_page(&mut page).await });
            }
            Err(_) => warn!("Browser session dropped outside a runtime, page left open"),
        }
    }
}

/// Launches Chrome sessions through chromedriver.
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn chrome_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--disable-blink-features=AutomationControlled",
            "--disable-extensions",
            "--no-sandbox",
            "--disable-infobars",
            "--disable-dev-shm-usage",
            "--disable-browser-side-navigation",
            "--disable-gpu",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if self.config.headless {
            args.push("--headless=new".to_string());
        }
        args.push(format!("--user-agent={}", self.config.user_agent));
        args
    }

    pub fn capabilities(&self) -> Map<String, Value> {
        // images: 2 blocks image loading
        let chrome_options = json!({
            "args": self.chrome_args(),
            "excludeSwitches": ["enable-automation"],
            "prefs": {
                "profile.default_content_settings": { "images": 2 },
                "profile.managed_default_content_settings": { "images": 2 },
            },
        });

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), chrome_options);
        caps
    }

    fn webdriver_url(&self) -> String {
        match self.config.chromedriver_path {
            Some(_) => format!("http://localhost:{}", self.config.chromedriver_port),
            None => self.config.webdriver_url.clone(),
        }
    }
}

fn spawn_chromedriver(path: &Path, port: u16) -> Result<Child, ScrapeError> {
    Command::new(path)
        .arg(format!("--port={port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            ScrapeError::SessionAcquisition(format!("cannot launch {}: {}", path.display(), e))
        })
}

#[async_trait]
impl Launcher for ChromeLauncher {
    type Page = WebDriverPage;

    async fn launch(&self) -> Result<WebDriverPage, ScrapeError> {
        let driver_process = match &self.config.chromedriver_path {
            Some(path) => {
                info!("Spawning chromedriver from {}", path.display());
                Some(spawn_chromedriver(path, self.config.chromedriver_port)?)
            }
            None => None,
        };

        let url = self.webdriver_url();
        let caps = self.capabilities();
        let attempts = self.config.connect_attempts.max(1);
        let mut last_err = String::new();

        for attempt in 1..=attempts {
            let mut builder = ClientBuilder::native();
            builder.capabilities(caps.clone());
            match builder.connect(&url).await {
                Ok(client) => {
                    info!("🚀Browser session opened via {}", url);
                    return Ok(WebDriverPage {
                        client,
                        driver_process,
                    });
                }
                Err(e) => {
                    debug!("WebDriver connect attempt {}/{} failed: {}", attempt, attempts, e);
                    last_err = e.to_string();
                    if attempt < attempts {
                        sleep(Duration::from_millis(self.config.connect_retry_ms)).await;
                    }
                }
            }
        }

        Err(ScrapeError::SessionAcquisition(format!(
            "no webdriver session at {}: {}",
            url, last_err
        )))
    }
}

/// A Chrome tab driven over the WebDriver protocol.
pub struct WebDriverPage {
    client: Client,
    driver_process: Option<Child>,
}

fn classify(err: CmdError, what: &str) -> DriverError {
    match err {
        CmdError::WaitTimeout => DriverError::Timeout(what.to_string()),
        CmdError::Lost(e) => DriverError::SessionLost(e.to_string()),
        CmdError::Standard(ref wd) if matches!(wd.error, ErrorStatus::NoSuchElement) => {
            DriverError::NoSuchElement(what.to_string())
        }
        CmdError::Standard(ref wd) if matches!(wd.error, ErrorStatus::InvalidSessionId) => {
            DriverError::SessionLost(format!("invalid session id during {what}"))
        }
        other => DriverError::Protocol(format!("{what}: {other}")),
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.client.goto(url).await.map_err(|e| match classify(e, url) {
            DriverError::SessionLost(msg) => DriverError::SessionLost(msg),
            other => DriverError::Navigation(other.to_string()),
        })
    }

    async fn wait_for_css(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
            .map(|_| ())
            .map_err(|e| classify(e, selector))
    }

    async fn click_when_clickable(
        &mut self,
        id: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Id(id))
            .await
            .map_err(|e| classify(e, id))?;

        loop {
            let displayed = element.is_displayed().await.map_err(|e| classify(e, id))?;
            let enabled = element.is_enabled().await.map_err(|e| classify(e, id))?;
            if displayed && enabled {
                return element.click().await.map_err(|e| classify(e, id));
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!("{id} to become clickable")));
            }
            sleep(CLICKABLE_POLL).await;
        }
    }

    async fn read_table(&mut self, timeout: Duration) -> Result<TableCells, DriverError> {
        let table = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css("table"))
            .await
            .map_err(|e| classify(e, "table"))?;

        let mut header = Vec::new();
        for th in table
            .find_all(Locator::Css("th"))
            .await
            .map_err(|e| classify(e, "th"))?
        {
            header.push(th.text().await.map_err(|e| classify(e, "th"))?);
        }

        let mut rows = Vec::new();
        for tr in table
            .find_all(Locator::Css("tr"))
            .await
            .map_err(|e| classify(e, "tr"))?
        {
            let mut row = Vec::new();
            for td in tr
                .find_all(Locator::Css("td"))
                .await
                .map_err(|e| classify(e, "td"))?
            {
                row.push(td.text().await.map_err(|e| classify(e, "td"))?);
            }
            rows.push(row);
        }

        Ok(TableCells { header, rows })
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        let closed = self.client.clone().close().await;
        if let Some(mut child) = self.driver_process.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to stop chromedriver: {}", e);
            }
        }
        closed.map_err(|e| classify(e, "close"))
    }
}
