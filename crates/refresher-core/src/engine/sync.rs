//! Bringing cached address records in line with the public address

use super::catalog::ZoneRecordCache;
use super::convergence::ConvergenceWaiter;
use super::events::{EngineEvent, EventSink};
use crate::error::Result;
use crate::shutdown::Shutdown;
use crate::traits::{ChangeRequest, DnsProvider};
use std::net::Ipv4Addr;
use tracing::{error, info, warn};

/// Outcome of one synchronization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records that already held the address
    pub in_sync: usize,
    /// Stale records left alone because updates are disabled
    pub stale_skipped: usize,
    /// Records updated and confirmed in sync
    pub updated: usize,
}

/// Submits UPSERTs for stale cached records, one zone at a time
#[derive(Debug, Clone)]
pub struct RecordSynchronizer {
    enabled: bool,
    waiter: ConvergenceWaiter,
}

impl RecordSynchronizer {
    /// Create a synchronizer
    ///
    /// With `enabled == false` stale records are only reported.
    pub fn new(enabled: bool, waiter: ConvergenceWaiter) -> Self {
        Self { enabled, waiter }
    }

    /// Run one pass over `cache`
    ///
    /// Each change is awaited to convergence before the next zone is looked
    /// at. The first submission or convergence error aborts the pass.
    pub async fn sync(
        &self,
        current_ip: Ipv4Addr,
        cache: &mut ZoneRecordCache,
        provider: &dyn DnsProvider,
        shutdown: &Shutdown,
        events: &EventSink,
    ) -> Result<SyncReport> {
        let target = current_ip.to_string();
        let mut report = SyncReport::default();

        for entry in cache.iter_mut() {
            if entry.record.value == target {
                report.in_sync += 1;
                continue;
            }

            if !self.enabled {
                warn!(
                    "Stale ip found @ {} but since refresher is disabled no change request will be sent!",
                    entry.record.name
                );
                events.emit(EngineEvent::RecordStale {
                    zone_name: entry.zone.name.clone(),
                    record_name: entry.record.name.clone(),
                    stale_value: entry.record.value.clone(),
                    current_ip,
                });
                report.stale_skipped += 1;
                continue;
            }

            info!(
                "{} @ {} has stale IP {} will update to {}",
                entry.zone.name, entry.record.name, entry.record.value, target
            );
            entry.record.value = target.clone();
            let change = ChangeRequest::upsert(entry.record.clone(), change_comment());

            info!("Applying change request @ {}...", entry.record.name);
            let change_id = shutdown
                .guard(provider.submit_change(&change))
                .await
                .inspect_err(|e| {
                    if !e.is_cancelled() {
                        error!("Change request @ {} was rejected: {}", entry.record.name, e);
                    }
                })?;

            events.emit(EngineEvent::ChangeSubmitted {
                zone_name: entry.zone.name.clone(),
                record_name: entry.record.name.clone(),
                change_id: change_id.to_string(),
                new_value: target.clone(),
            });

            let polls = self
                .waiter
                .await_convergence(provider, &change_id, &entry.record.name, shutdown)
                .await
                .inspect_err(|e| {
                    if !e.is_cancelled() {
                        error!("Change {} @ {} did not converge: {}", change_id, entry.record.name, e);
                    }
                })?;

            events.emit(EngineEvent::ChangeInSync {
                zone_name: entry.zone.name.clone(),
                record_name: entry.record.name.clone(),
                change_id: change_id.to_string(),
                polls,
            });
            report.updated += 1;
        }

        if report.stale_skipped == 0 {
            info!("All valid hosted zones are in sync!");
            events.emit(EngineEvent::AllInSync {
                zones_count: cache.len(),
            });
        } else {
            warn!(
                "{} zone(s) remain stale because the refresher is disabled",
                report.stale_skipped
            );
        }

        Ok(report)
    }
}

fn change_comment() -> String {
    format!(
        "Refresher auto action @ {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}
