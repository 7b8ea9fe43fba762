//! Configuration types for the refresher
//!
//! This module defines all configuration structures used throughout the crate.
//!
//! Keys are PascalCase so an `appsettings.json` style document with a
//! `RefresherOptions` section deserializes directly:
//!
//! ```json
//! {
//!   "RefresherOptions": {
//!     "Enabled": true,
//!     "RefreshRateInMs": 60000,
//!     "PublicIpProvider": "https://checkip.amazonaws.com",
//!     "TargetDomain": "example.com"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Section name holding the refresher settings in a JSON settings document
pub const CONFIG_SECTION: &str = "RefresherOptions";

/// Main refresher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RefresherConfig {
    /// Whether stale records are actually updated (false = report only)
    #[serde(default)]
    pub enabled: bool,

    /// Interval between public IP checks (in milliseconds)
    #[serde(rename = "RefreshRateInMs", default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// URL answering with the bare public IPv4 address
    #[serde(default = "default_public_ip_provider")]
    pub public_ip_provider: String,

    /// Substring a zone name must contain to be managed
    #[serde(default)]
    pub target_domain: String,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RefresherConfig {
    /// Create a new configuration with defaults for the given target domain
    pub fn new(target_domain: impl Into<String>) -> Self {
        Self {
            enabled: false,
            refresh_interval_ms: default_refresh_interval_ms(),
            public_ip_provider: default_public_ip_provider(),
            target_domain: target_domain.into(),
            engine: EngineConfig::default(),
        }
    }

    /// Enable or disable record updates
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the refresh interval
    pub fn with_refresh_interval_ms(mut self, refresh_interval_ms: u64) -> Self {
        self.refresh_interval_ms = refresh_interval_ms;
        self
    }

    /// Set the public IP provider URL
    pub fn with_public_ip_provider(mut self, url: impl Into<String>) -> Self {
        self.public_ip_provider = url.into();
        self
    }

    /// Replace the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Parse the `RefresherOptions` section of a JSON settings document
    pub fn from_json_section(json: &str) -> Result<Self, crate::Error> {
        let document: serde_json::Value = serde_json::from_str(json)?;
        let section = document.get(CONFIG_SECTION).ok_or_else(|| {
            crate::Error::config(format!("Missing \"{}\" section", CONFIG_SECTION))
        })?;

        Ok(serde_json::from_value(section.clone())?)
    }

    /// Read and parse a JSON settings file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_section(&json)
    }

    /// Interval between public IP checks
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.refresh_interval_ms == 0 {
            return Err(crate::Error::config("RefreshRateInMs must be > 0"));
        }

        if self.public_ip_provider.is_empty() {
            return Err(crate::Error::config("PublicIpProvider cannot be empty"));
        }

        if !self.public_ip_provider.starts_with("https://")
            && !self.public_ip_provider.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "PublicIpProvider must use HTTP or HTTPS scheme. Got: {}",
                self.public_ip_provider
            )));
        }

        if self.target_domain.trim().is_empty() {
            return Err(crate::Error::config("TargetDomain cannot be empty"));
        }

        self.engine.validate()
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineConfig {
    /// How long a single public IP request may take (in milliseconds)
    #[serde(default = "default_ip_timeout_ms")]
    pub ip_timeout_ms: u64,

    /// Delay between submitting a change and the first status check (in seconds)
    #[serde(default = "default_first_check_delay_secs")]
    pub first_check_delay_secs: u64,

    /// Delay between subsequent status checks (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound on status checks per change
    ///
    /// `None` polls until the provider reports the change in sync, however
    /// long that takes.
    #[serde(default)]
    pub max_convergence_polls: Option<usize>,

    /// Whether a failed change submission or status check stops the loop
    ///
    /// When false the failure is logged and the loop waits for the next
    /// tick. The cached record already carries the target value at that
    /// point, so the failed zone is only retried after the next address
    /// change.
    #[serde(default = "default_halt_on_update_failure")]
    pub halt_on_update_failure: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Timeout applied to each public IP request
    pub fn ip_timeout(&self) -> Duration {
        Duration::from_millis(self.ip_timeout_ms)
    }

    /// Delay before the first status check of a change
    pub fn first_check_delay(&self) -> Duration {
        Duration::from_secs(self.first_check_delay_secs)
    }

    /// Delay between status checks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ip_timeout_ms == 0 {
            return Err(crate::Error::config("Engine.IpTimeoutMs must be > 0"));
        }
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Engine.PollIntervalSecs must be > 0"));
        }
        if self.max_convergence_polls == Some(0) {
            return Err(crate::Error::config(
                "Engine.MaxConvergencePolls must be > 0 when set",
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "Engine.EventChannelCapacity must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ip_timeout_ms: default_ip_timeout_ms(),
            first_check_delay_secs: default_first_check_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            max_convergence_polls: None,
            halt_on_update_failure: default_halt_on_update_failure(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_refresh_interval_ms() -> u64 {
    60_000
}

fn default_public_ip_provider() -> String {
    "https://checkip.amazonaws.com".to_string()
}

fn default_ip_timeout_ms() -> u64 {
    1_000
}

fn default_first_check_delay_secs() -> u64 {
    5
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_halt_on_update_failure() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}
