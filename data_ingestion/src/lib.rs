pub mod browser;
pub mod config;
pub mod consent;
pub mod error;
pub mod extract;
pub mod job;
pub mod logger;
pub mod orchestrator;
pub mod pacing;
pub mod persist;

#[cfg(test)]
mod testing;

pub use browser::{BrowserSession, ChromeLauncher, Launcher, PageDriver};
pub use error::{FailureTag, ScrapeError};
pub use job::{JobOutcome, JobStatus, ScrapeJob, ScrapeTarget};
pub use orchestrator::{RunReport, ScrapeOrchestrator};
pub use persist::DatasetStore;
