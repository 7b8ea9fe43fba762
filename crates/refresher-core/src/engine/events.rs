//! Monitoring events emitted by the refresher

use std::net::Ipv4Addr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Events emitted by the [`Refresher`](super::Refresher)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Initial address resolved and zone cache built
    Initialized {
        public_ip: Ipv4Addr,
        zones_count: usize,
    },

    /// A new public address was observed
    IpChanged {
        previous_ip: Option<Ipv4Addr>,
        new_ip: Ipv4Addr,
    },

    /// Resolution produced no result; the last known address was kept
    AddressRetained { retained_ip: Option<Ipv4Addr> },

    /// A record is stale but updates are disabled
    RecordStale {
        zone_name: String,
        record_name: String,
        stale_value: String,
        current_ip: Ipv4Addr,
    },

    /// A change was accepted by the provider
    ChangeSubmitted {
        zone_name: String,
        record_name: String,
        change_id: String,
        new_value: String,
    },

    /// A submitted change reached all authoritative servers
    ChangeInSync {
        zone_name: String,
        record_name: String,
        change_id: String,
        polls: usize,
    },

    /// A sync pass finished with every cached record matching the address
    AllInSync { zones_count: usize },

    /// A sync pass failed and the loop carries on
    UpdateFailed { error: String },

    /// Refresher stopped
    Stopped { reason: String },
}

/// Bounded, non-blocking sender for [`EngineEvent`]s
///
/// The engine never waits on its observers: when the channel is full the
/// event is dropped with a warning, and when the receiver is gone events are
/// discarded silently.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl EventSink {
    /// Create a sink and the receiver observing it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Emit an engine event
    pub fn emit(&self, event: EngineEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing EventChannelCapacity.");
            }
            Err(TrySendError::Closed(event)) => {
                debug!("No event receiver, discarding {:?}", event);
            }
        }
    }
}
