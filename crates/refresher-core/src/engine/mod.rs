//! Core refresh engine
//!
//! The Refresher is responsible for:
//! - Resolving the public IPv4 address on a fixed interval
//! - Discovering the zones and address records it manages (once)
//! - Updating stale records and waiting for the change to propagate
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!                  │  Refresher   │── EngineEvent ──▶ observers
//!                  └──────────────┘
//!                         │
//!      ┌──────────────────┼───────────────────┐
//!      │                  │                   │
//!      ▼                  ▼                   ▼
//! ┌───────────┐   ┌──────────────┐   ┌──────────────────┐
//! │IpResolver │   │ ZoneCatalog  │   │RecordSynchronizer│
//! │(IpSource) │   │ (init only)  │   │ + Convergence    │
//! └───────────┘   └──────────────┘   └──────────────────┘
//! ```
//!
//! ## Flow
//!
//! 1. Resolve the initial address (failure here is fatal)
//! 2. Build the zone → record cache
//! 3. Sync once, whatever the address, to fix drift present at startup
//! 4. Every interval: resolve; if the address changed, sync again

mod catalog;
mod convergence;
mod events;
mod resolver;
mod sync;

pub use catalog::{CachedZone, ZoneRecordCache, discover};
pub use convergence::ConvergenceWaiter;
pub use events::{EngineEvent, EventSink};
pub use resolver::{IpResolver, parse_ipv4};
pub use sync::{RecordSynchronizer, SyncReport};

use crate::config::RefresherConfig;
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;
use crate::traits::{DnsProvider, IpSource};
use std::net::Ipv4Addr;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What a single refresh observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The resolved address equals the last known one
    Unchanged,
    /// No address could be resolved; the last known one was kept
    Retained,
    /// The address changed and a sync pass completed
    Synced(SyncReport),
    /// The address changed, the sync pass failed, and the loop carries on
    SyncFailed,
}

/// Core refresh engine
///
/// Owns the last known public address and the zone → record cache. All
/// state lives in this value, so independent instances never interfere.
///
/// ## Lifecycle
///
/// 1. Create with [`Refresher::new()`]
/// 2. Start with [`Refresher::run_with_shutdown()`]
/// 3. Runs until the shutdown signal fires or a fatal error occurs
///
/// ## Threading
///
/// Single task, strictly sequential: one zone at a time, one change at a
/// time. No locks are involved.
pub struct Refresher {
    /// Public address resolution
    resolver: IpResolver,

    /// DNS provider for zones, records and changes
    provider: Box<dyn DnsProvider>,

    /// Stale record handling
    synchronizer: RecordSynchronizer,

    /// Settings, immutable for the engine lifetime
    config: RefresherConfig,

    /// Last known public address
    public_ip: Option<Ipv4Addr>,

    /// Zones and records under management
    cache: ZoneRecordCache,

    /// Event sender for external monitoring
    events: EventSink,
}

impl Refresher {
    /// Create a new refresher
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: Refresher configuration
    ///
    /// # Returns
    ///
    /// A tuple of (refresher, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: RefresherConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (events, rx) = EventSink::channel(config.engine.event_channel_capacity);
        let waiter = ConvergenceWaiter::new(
            config.engine.first_check_delay(),
            config.engine.poll_interval(),
            config.engine.max_convergence_polls,
        );

        let refresher = Self {
            resolver: IpResolver::new(ip_source, config.engine.ip_timeout()),
            provider,
            synchronizer: RecordSynchronizer::new(config.enabled, waiter),
            config,
            public_ip: None,
            cache: ZoneRecordCache::new(),
            events,
        };

        Ok((refresher, rx))
    }

    /// Last known public address
    pub fn public_ip(&self) -> Option<Ipv4Addr> {
        self.public_ip
    }

    /// Zones and records under management
    pub fn cache(&self) -> &ZoneRecordCache {
        &self.cache
    }

    /// Active configuration
    pub fn config(&self) -> &RefresherConfig {
        &self.config
    }

    /// Run the refresher until `shutdown` fires or a fatal error occurs
    pub async fn run_with_shutdown(&mut self, shutdown: Shutdown) -> Result<()> {
        match self.run_internal(&shutdown).await {
            Ok(()) | Err(Error::Cancelled) => {
                info!("Shutdown signal received, refresher stopped");
                self.events.emit(EngineEvent::Stopped {
                    reason: "Shutdown signal".to_string(),
                });
                Ok(())
            }
            Err(e) => {
                error!("Refresher stopped on fatal error: {}", e);
                self.events.emit(EngineEvent::Stopped {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_internal(&mut self, shutdown: &Shutdown) -> Result<()> {
        self.initialize(shutdown).await?;

        while !shutdown.is_triggered() {
            self.tick(shutdown).await?;
        }

        Ok(())
    }

    /// Resolve the initial address, build the cache and sync once
    ///
    /// # Errors
    ///
    /// - [`Error::InitialAddressUnavailable`] if no address can be resolved
    /// - [`Error::ZoneListing`] if zones cannot be listed
    /// - resolver and sync errors as for [`Refresher::refresh()`]
    pub async fn initialize(&mut self, shutdown: &Shutdown) -> Result<TickOutcome> {
        info!(
            enabled = self.config.enabled,
            public_ip_provider = %self.config.public_ip_provider,
            refresh_interval_ms = self.config.refresh_interval_ms,
            target_domain = %self.config.target_domain,
            "Initializing refresher"
        );
        if !self.config.enabled {
            warn!("Refresher is not enabled, and will NOT update DNS records!");
        }

        info!("Retrieving initial public ip...");
        let Some(public_ip) = self.resolver.resolve(shutdown).await? else {
            error!("Could not resolve the initial public ip, there is no previous address to fall back on");
            return Err(Error::InitialAddressUnavailable);
        };
        self.public_ip = Some(public_ip);
        info!("Current public IP Address is: {}", public_ip);

        info!(
            "Retrieving hosted zones that match target domain {}",
            self.config.target_domain
        );
        self.cache = discover(
            self.provider.as_ref(),
            &self.config.target_domain,
            shutdown,
        )
        .await?;

        self.events.emit(EngineEvent::Initialized {
            public_ip,
            zones_count: self.cache.len(),
        });

        info!("Updating {} records...", self.provider.provider_name());
        self.sync_pass(public_ip, shutdown).await
    }

    /// Wait one refresh interval, then [`refresh`](Refresher::refresh)
    pub async fn tick(&mut self, shutdown: &Shutdown) -> Result<TickOutcome> {
        shutdown.sleep(self.config.refresh_interval()).await?;
        self.refresh(shutdown).await
    }

    /// Resolve the address and sync if it changed
    ///
    /// An unchanged address costs no provider call at all.
    pub async fn refresh(&mut self, shutdown: &Shutdown) -> Result<TickOutcome> {
        let Some(new_ip) = self.resolver.resolve(shutdown).await? else {
            warn!(
                "Could not resolve correct public IP, keeping old (probably stale) IP {:?}",
                self.public_ip
            );
            self.events.emit(EngineEvent::AddressRetained {
                retained_ip: self.public_ip,
            });
            return Ok(TickOutcome::Retained);
        };

        if self.public_ip == Some(new_ip) {
            debug!("Public ip unchanged ({})", new_ip);
            return Ok(TickOutcome::Unchanged);
        }

        match self.public_ip {
            Some(previous_ip) => info!(
                "Public ip change detected from {} to {}!",
                previous_ip, new_ip
            ),
            None => info!("Public ip resolved to {}", new_ip),
        }
        self.events.emit(EngineEvent::IpChanged {
            previous_ip: self.public_ip,
            new_ip,
        });
        self.public_ip = Some(new_ip);

        self.sync_pass(new_ip, shutdown).await
    }

    /// Run the synchronizer and apply the update failure policy
    async fn sync_pass(&mut self, ip: Ipv4Addr, shutdown: &Shutdown) -> Result<TickOutcome> {
        let result = self
            .synchronizer
            .sync(
                ip,
                &mut self.cache,
                self.provider.as_ref(),
                shutdown,
                &self.events,
            )
            .await;

        match result {
            Ok(report) => Ok(TickOutcome::Synced(report)),
            Err(e) if e.is_update_failure() && !self.config.engine.halt_on_update_failure => {
                error!("Sync pass failed, will try again on the next address change: {}", e);
                self.events.emit(EngineEvent::UpdateFailed {
                    error: e.to_string(),
                });
                Ok(TickOutcome::SyncFailed)
            }
            Err(e) => Err(e),
        }
    }
}
