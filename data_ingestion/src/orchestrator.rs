use log::{error, info, warn};
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;

use crate::browser::{BrowserSession, Launcher};
use crate::config::RetryConfig;
use crate::error::ScrapeError;
use crate::job::{JobOutcome, ScrapeJob, ScrapeTarget};
use crate::pacing::Pacer;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// One outcome per target, in target order.
    pub outcomes: Vec<JobOutcome>,
    /// Sessions used to produce the outcomes.
    pub attempts: u32,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

/// Runs a batch of targets sequentially on one shared browser session,
/// restarting the whole batch on a fresh session when a job escapes with an
/// unexpected error.
pub struct ScrapeOrchestrator<L: Launcher> {
    launcher: L,
    job: ScrapeJob,
    pacer: Pacer,
    max_attempts: u32,
    backoff: Duration,
}

impl<L: Launcher> ScrapeOrchestrator<L> {
    pub fn new(launcher: L, job: ScrapeJob, retry: &RetryConfig, pacer: Pacer) -> Self {
        Self {
            launcher,
            job,
            pacer,
            max_attempts: retry.max_attempts.max(1),
            backoff: retry.backoff(),
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Session acquisition failure and exhaustion of the attempt bound are the
    /// only errors returned; per-target failures are recorded in the report.
    pub async fn run(&self, targets: &[ScrapeTarget]) -> Result<RunReport, ScrapeError> {
        let mut last = String::new();

        for attempt in 1..=self.max_attempts {
            info!(
                "🚀Scrape run attempt {}/{} over {} targets",
                attempt,
                self.max_attempts,
                targets.len()
            );
            let mut session = BrowserSession::acquire(&self.launcher).await?;
            let result = self.run_targets(&mut session, targets).await;
            session.release().await;

            match result {
                Ok(outcomes) => {
                    let report = RunReport {
                        outcomes,
                        attempts: attempt,
                    };
                    info!(
                        "Scrape run done✅ {}/{} targets succeeded",
                        report.succeeded(),
                        targets.len()
                    );
                    return Ok(report);
                }
                Err(e) => {
                    error!("Attempt {}/{} failed: {}", attempt, self.max_attempts, e);
                    last = e.to_string();
                    if attempt < self.max_attempts {
                        warn!("Retrying with a fresh session in {:?}", self.backoff);
                        sleep(self.backoff).await;
                    }
                }
            }
        }

        Err(ScrapeError::RetriesExhausted {
            attempts: self.max_attempts,
            last,
        })
    }

    /// Scrapes a single target on its own session, without batch retries.
    pub async fn scrape_one(&self, target: &ScrapeTarget) -> Result<JobOutcome, ScrapeError> {
        let mut session = BrowserSession::acquire(&self.launcher).await?;
        let result = match session.page() {
            Ok(page) => self.job.run(page, target).await,
            Err(e) => Err(e),
        };
        session.release().await;
        result
    }

    async fn run_targets(
        &self,
        session: &mut BrowserSession<L::Page>,
        targets: &[ScrapeTarget],
    ) -> Result<Vec<JobOutcome>, ScrapeError> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = self.job.run(session.page()?, target).await?;
            if !outcome.is_success() {
                warn!("[{}] Processing failed, moving to next target", target.symbol);
            }
            outcomes.push(outcome);
            self.pacer.pause().await;
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::error::{DriverError, FailureTag};
    use crate::job::JobStatus;
    use crate::testing::{ScriptedLauncher, ScriptedPage, table};

    fn orchestrator(
        launcher: ScriptedLauncher,
        dir: &std::path::Path,
    ) -> ScrapeOrchestrator<ScriptedLauncher> {
        let config = ScraperConfig {
            data_dir: dir.to_path_buf(),
            ..ScraperConfig::default()
        };
        let job = ScrapeJob::new(&config).with_pacer(Pacer::disabled());
        let retry = RetryConfig {
            max_attempts: 3,
            backoff_secs: 0,
        };
        ScrapeOrchestrator::new(launcher, job, &retry, Pacer::disabled())
    }

    fn targets() -> Vec<ScrapeTarget> {
        vec![
            ScrapeTarget::new("BTC", "u1"),
            ScrapeTarget::new("ETH", "u2"),
            ScrapeTarget::new("SOL", "u3"),
        ]
    }

    fn good_table() -> crate::browser::TableCells {
        table(&["Date", "Close"], &[&[], &["Oct 14, 2024", "$1"]])
    }

    #[tokio::test]
    async fn failed_target_does_not_abort_run() {
        let dir = tempfile::tempdir().unwrap();
        let page = ScriptedPage::default()
            .with_table("u1", good_table())
            .with_navigation_failure("u2", DriverError::Navigation("offline".into()))
            .with_table("u3", good_table());
        let orch = orchestrator(ScriptedLauncher::new(vec![page]), dir.path());

        let report = orch.run(&targets()).await.unwrap();
        let symbols: Vec<_> = report.outcomes.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "SOL"]);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.outcomes[1].tag, Some(FailureTag::NetworkError));
        assert_eq!(report.succeeded(), 2);
        assert_eq!(orch.launcher().launched(), 1);
        assert_eq!(orch.launcher().released(), 1);
    }

    #[tokio::test]
    async fn single_extraction_failure_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(ScriptedLauncher::new(vec![ScriptedPage::default()]), dir.path());

        let report = orch.run(&[ScrapeTarget::new("BTC", "url1")]).await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].symbol, "BTC");
        assert_eq!(report.outcomes[0].status, JobStatus::Failed);
        assert_eq!(report.outcomes[0].tag, Some(FailureTag::ExtractionError));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unexpected_error_retries_whole_batch_on_fresh_session() {
        let dir = tempfile::tempdir().unwrap();
        let broken = ScriptedPage::default()
            .with_table("u1", good_table())
            .with_table_error("u2", DriverError::SessionLost("renderer crashed".into()));
        let healthy = ScriptedPage::default()
            .with_table("u1", good_table())
            .with_table("u2", good_table())
            .with_table("u3", good_table());
        let orch = orchestrator(ScriptedLauncher::new(vec![broken, healthy]), dir.path());

        let report = orch.run(&targets()).await.unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(orch.launcher().launched(), 2);
        assert_eq!(orch.launcher().released(), 2);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let crashing = || {
            ScriptedPage::default()
                .with_navigation_failure("u1", DriverError::SessionLost("gone".into()))
        };
        let pages = (0..5).map(|_| crashing()).collect();
        let orch = orchestrator(ScriptedLauncher::new(pages), dir.path());

        let err = orch.run(&targets()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(orch.launcher().launched(), 3);
        assert_eq!(orch.launcher().released(), 3);
    }

    #[tokio::test]
    async fn scrape_one_releases_session_on_escaped_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = ScriptedPage::default()
            .with_table_error("u1", DriverError::SessionLost("crashed".into()));
        let orch = orchestrator(ScriptedLauncher::new(vec![page]), dir.path());

        let err = orch.scrape_one(&ScrapeTarget::new("BTC", "u1")).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Unexpected(_)));
        assert_eq!(orch.launcher().released(), 1);
    }

    #[tokio::test]
    async fn cancelled_scrape_still_releases_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScraperConfig {
            data_dir: dir.path().to_path_buf(),
            ..ScraperConfig::default()
        };
        let slow = Pacer::new(Duration::from_millis(500), Duration::from_millis(500));
        let job = ScrapeJob::new(&config).with_pacer(slow);
        let retry = RetryConfig {
            max_attempts: 1,
            backoff_secs: 0,
        };
        let launcher = ScriptedLauncher::new(vec![ScriptedPage::default()]);
        let orch = ScrapeOrchestrator::new(launcher, job, &retry, Pacer::disabled());

        let target = ScrapeTarget::new("BTC", "u1");
        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), orch.scrape_one(&target)).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(orch.launcher().launched(), 1);
        assert_eq!(orch.launcher().released(), 1);
    }

    #[tokio::test]
    async fn acquisition_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(ScriptedLauncher::new(vec![]), dir.path());

        let err = orch.run(&targets()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::SessionAcquisition(_)));
        assert_eq!(orch.launcher().released(), 0);
    }
}
