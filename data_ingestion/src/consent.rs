use log::{debug, info};
use std::time::Duration;

use crate::browser::PageDriver;
use crate::config::ConsentConfig;
use crate::error::DriverError;

/// Best-effort dismissal of a cookie consent overlay. Never fails the job.
#[derive(Debug, Clone)]
pub struct ConsentHandler {
    accept_button_id: String,
    attempts: u32,
}

impl ConsentHandler {
    pub fn new(accept_button_id: impl Into<String>, attempts: u32) -> Self {
        Self {
            accept_button_id: accept_button_id.into(),
            attempts,
        }
    }

    /// Returns true once the accept control was clicked; false when it never
    /// became clickable within `attempts` waits of `timeout` each.
    pub async fn dismiss<P>(&self, page: &mut P, timeout: Duration) -> Result<bool, DriverError>
    where
        P: PageDriver + ?Sized,
    {
        for attempt in 1..=self.attempts {
            match page.click_when_clickable(&self.accept_button_id, timeout).await {
                Ok(()) => {
                    info!("Cookies accepted");
                    return Ok(true);
                }
                Err(DriverError::SessionLost(msg)) => return Err(DriverError::SessionLost(msg)),
                Err(e) => {
                    debug!(
                        "No consent banner visible (attempt {}/{}): {}",
                        attempt, self.attempts, e
                    );
                }
            }
        }
        Ok(false)
    }
}

impl From<&ConsentConfig> for ConsentHandler {
    fn from(cfg: &ConsentConfig) -> Self {
        ConsentHandler::new(cfg.accept_button_id.clone(), cfg.attempts)
    }
}
