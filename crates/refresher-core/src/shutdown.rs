//! Shutdown signal shared by every suspension point of the refresh loop
//!
//! The loop sleeps between ticks, races the IP request against a timeout,
//! and waits between convergence polls. All of those must abort promptly
//! when the process is asked to stop, so they all observe the same
//! [`Shutdown`] token.
//!
//! ```rust
//! # use refresher_core::shutdown::Shutdown;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (trigger, shutdown) = Shutdown::new();
//! trigger.trigger();
//! assert!(shutdown.is_triggered());
//! # }
//! ```

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Sending half of the shutdown signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Fire the signal; every clone of the paired [`Shutdown`] observes it
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half of the shutdown signal
///
/// Cheap to clone. Once triggered it stays triggered.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a connected trigger/token pair
    pub fn new() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Self { rx })
    }

    /// Whether the signal has fired
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal fires
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        let sender_dropped = rx.wait_for(|fired| *fired).await.is_err();
        if sender_dropped {
            std::future::pending::<()>().await;
        }
    }

    /// Drive `operation` to completion unless the signal fires first
    ///
    /// When the signal wins, `operation` is dropped and
    /// [`Error::Cancelled`] is returned.
    pub async fn guard<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.triggered() => Err(Error::Cancelled),
            result = operation => result,
        }
    }

    /// Sleep for `duration` unless the signal fires first
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.guard(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_is_observed_by_clones() {
        let (trigger, shutdown) = Shutdown::new();
        let clone = shutdown.clone();
        assert!(!clone.is_triggered());

        trigger.trigger();
        assert!(shutdown.is_triggered());
        assert!(clone.is_triggered());
        clone.triggered().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_aborted_by_trigger() {
        let (trigger, shutdown) = Shutdown::new();

        let sleeper = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.sleep(Duration::from_secs(3600)).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();

        let result = sleeper.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_trigger() {
        let (_trigger, shutdown) = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_secs(10)).await.is_ok());
    }

    #[tokio::test]
    async fn guard_after_trigger_never_runs_operation() {
        let (trigger, shutdown) = Shutdown::new();
        trigger.trigger();

        let result = shutdown.guard(async { Ok(42) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
