use anyhow::Result;
use data_ingestion::config::ScraperConfig;
use data_ingestion::logger::init_logger;
use data_ingestion::pacing::Pacer;
use data_ingestion::{ChromeLauncher, ScrapeJob, ScrapeOrchestrator};
use log::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let config = ScraperConfig::from_env()?;
    info!(
        "Scraping {} targets into {}",
        config.targets.len(),
        config.data_dir.display()
    );

    let launcher = ChromeLauncher::new(config.browser.clone());
    let job = ScrapeJob::new(&config);
    let orchestrator =
        ScrapeOrchestrator::new(launcher, job, &config.retry, Pacer::from(&config.pacing));

    let report = orchestrator.run(&config.targets).await?;

    for outcome in &report.outcomes {
        match (&outcome.tag, &outcome.path) {
            (Some(tag), _) => warn!(
                "[{}] {} - {}",
                outcome.symbol,
                tag,
                outcome.detail.as_deref().unwrap_or("")
            ),
            (None, Some(path)) => info!(
                "[{}] {} rows -> {}",
                outcome.symbol,
                outcome.rows,
                path.display()
            ),
            (None, None) => info!("[{}] done", outcome.symbol),
        }
    }
    info!(
        "Finished after {} attempt(s): {}/{} targets scraped",
        report.attempts,
        report.succeeded(),
        report.outcomes.len()
    );

    Ok(())
}
