use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::job::ScrapeTarget;

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    /// chromedriver binary to spawn before connecting. When unset an already
    /// running driver at `webdriver_url` is expected.
    pub chromedriver_path: Option<PathBuf>,
    pub chromedriver_port: u16,
    pub headless: bool,
    pub user_agent: String,
    pub connect_attempts: u32,
    pub connect_retry_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            chromedriver_path: None,
            chromedriver_port: 9515,
            headless: true,
            user_agent: CHROME_USER_AGENT.to_string(),
            connect_attempts: 10,
            connect_retry_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub accept_button_id: String,
    pub attempts: u32,
    pub wait_secs: u64,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            accept_button_id: "onetrust-accept-btn-handler".to_string(),
            attempts: 3,
            wait_secs: 5,
        }
    }
}

impl ConsentConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub page_load_timeout_secs: u64,
    pub table_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_secs: 20,
            table_timeout_secs: 10,
        }
    }
}

impl ExtractionConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn table_timeout(&self) -> Duration {
        Duration::from_secs(self.table_timeout_secs)
    }
}

/// Bounds of the randomized pause inserted between scrape steps.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 2_000,
            max_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 10,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub data_dir: PathBuf,
    pub browser: BrowserConfig,
    pub consent: ConsentConfig,
    pub extraction: ExtractionConfig,
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
    pub targets: Vec<ScrapeTarget>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            browser: BrowserConfig::default(),
            consent: ConsentConfig::default(),
            extraction: ExtractionConfig::default(),
            pacing: PacingConfig::default(),
            retry: RetryConfig::default(),
            targets: default_targets(),
        }
    }
}

impl ScraperConfig {
    /// Reads `scraper.toml` from the working directory if present, then
    /// applies `SCRAPER__*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new("scraper.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("SCRAPER").separator("__"))
            .build()?;

        cfg.try_deserialize()
    }
}

fn default_targets() -> Vec<ScrapeTarget> {
    [
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("XRP", "xrp"),
        ("BNB", "bnb"),
        ("SOL", "solana"),
        ("LINK", "chainlink"),
    ]
    .into_iter()
    .map(|(symbol, slug)| ScrapeTarget {
        symbol: symbol.to_string(),
        source_url: format!("https://coinmarketcap.com/currencies/{slug}/historical-data/"),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_observed_constants() {
        let cfg = ScraperConfig::default();
        assert_eq!(cfg.consent.attempts, 3);
        assert_eq!(cfg.consent.wait(), Duration::from_secs(5));
        assert_eq!(cfg.extraction.page_load_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.extraction.table_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.backoff(), Duration::from_secs(10));
        assert_eq!((cfg.pacing.min_ms, cfg.pacing.max_ms), (2_000, 5_000));
        assert_eq!(cfg.targets.len(), 6);
        assert_eq!(cfg.targets[0].symbol, "BTC");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = ScraperConfig::load(Path::new("/nonexistent/scraper.toml")).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert!(cfg.browser.headless);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
data_dir = "/tmp/markets"

[retry]
max_attempts = 5

[[targets]]
symbol = "DOGE"
source_url = "https://example.com/doge"
"#
        )
        .unwrap();

        let cfg = ScraperConfig::load(file.path()).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/markets"));
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.backoff_secs, 10);
        assert_eq!(cfg.targets.len(), 1);
        assert_eq!(cfg.targets[0].symbol, "DOGE");
    }
}
