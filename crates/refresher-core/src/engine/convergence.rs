//! Waiting for a submitted change to propagate
//!
//! ```text
//! SUBMITTED ──first delay──▶ CHECK ──PENDING──▶ poll interval ──▶ CHECK ...
//!                              │
//!                            INSYNC ──▶ DONE
//! ```

use crate::error::{Error, Result};
use crate::shutdown::Shutdown;
use crate::traits::{ChangeId, ChangeStatus, DnsProvider};
use std::time::Duration;
use tracing::info;

/// Polls a change's status until the provider reports it in sync
#[derive(Debug, Clone)]
pub struct ConvergenceWaiter {
    first_check_delay: Duration,
    poll_interval: Duration,
    max_polls: Option<usize>,
}

impl ConvergenceWaiter {
    /// Create a waiter
    ///
    /// With `max_polls == None` the waiter polls for as long as it takes.
    pub fn new(first_check_delay: Duration, poll_interval: Duration, max_polls: Option<usize>) -> Self {
        Self {
            first_check_delay,
            poll_interval,
            max_polls,
        }
    }

    /// Block until `change_id` is in sync
    ///
    /// # Returns
    ///
    /// - `Ok(polls)`: Number of status queries performed
    /// - `Err(Error::ConvergenceTimeout)`: `max_polls` queries all reported pending
    /// - `Err(Error::Cancelled)`: Shutdown fired while waiting
    /// - `Err(_)`: A status query failed
    pub async fn await_convergence(
        &self,
        provider: &dyn DnsProvider,
        change_id: &ChangeId,
        record_name: &str,
        shutdown: &Shutdown,
    ) -> Result<usize> {
        shutdown.sleep(self.first_check_delay).await?;

        let mut polls = 0;
        loop {
            let status = shutdown.guard(provider.change_status(change_id)).await?;
            polls += 1;

            if status == ChangeStatus::InSync {
                info!("Request @ {} has completed!", record_name);
                return Ok(polls);
            }

            if let Some(max_polls) = self.max_polls
                && polls >= max_polls
            {
                return Err(Error::ConvergenceTimeout {
                    change_id: change_id.to_string(),
                    polls,
                });
            }

            info!("Request @ {} is pending...", record_name);
            shutdown.sleep(self.poll_interval).await?;
        }
    }
}
