// # refresherd - Route53 refresher daemon
//
// The refresherd daemon is a thin integration layer. It is responsible for:
// 1. Loading configuration (JSON settings file plus environment overrides)
// 2. Initializing logging and the runtime
// 3. Wiring the HTTP IP source and the Route53 provider into the engine
// 4. Translating SIGTERM/SIGINT into the engine's shutdown signal
//
// All refresh logic lives in refresher-core.
//
// ## Configuration
//
// - `REFRESHER_CONFIG_FILE`: JSON file with a `RefresherOptions` section (optional)
// - `REFRESHER_ENABLED`: `true` to actually update records (default: false)
// - `REFRESHER_REFRESH_RATE_MS`: Interval between IP checks (default: 60000)
// - `REFRESHER_PUBLIC_IP_PROVIDER`: IP service URL (default: https://checkip.amazonaws.com)
// - `REFRESHER_TARGET_DOMAIN`: Substring selecting the managed zones (required)
// - `REFRESHER_MAX_CONVERGENCE_POLLS`: Status checks per change before giving up (default: unbounded)
// - `REFRESHER_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// Environment variables win over the file. AWS region and credentials come
// from the standard AWS environment and profile chain.
//
// ## Example
//
// ```bash
// export REFRESHER_TARGET_DOMAIN=example.com
// export REFRESHER_ENABLED=true
// export AWS_PROFILE=dns-admin
//
// refresherd
// ```

use anyhow::{Context, Result};
use refresher_core::{Refresher, RefresherConfig, Shutdown};
use refresher_ip_http::HttpIpSource;
use refresher_provider_route53::Route53Provider;
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefresherExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (fatal engine error)
    RuntimeError = 2,
}

impl From<RefresherExitCode> for ExitCode {
    fn from(code: RefresherExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings: the engine configuration plus logging
#[derive(Debug)]
struct Settings {
    refresher: RefresherConfig,
    log_level: String,
}

impl Settings {
    /// Load settings from the process environment
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup`, which maps variable names to values
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut refresher = match lookup("REFRESHER_CONFIG_FILE") {
            Some(path) => RefresherConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load REFRESHER_CONFIG_FILE {}", path))?,
            None => RefresherConfig::new(""),
        };

        if let Some(value) = lookup("REFRESHER_ENABLED") {
            refresher.enabled = parse_bool("REFRESHER_ENABLED", &value)?;
        }
        if let Some(value) = lookup("REFRESHER_REFRESH_RATE_MS") {
            refresher.refresh_interval_ms = value.trim().parse::<u64>().with_context(|| {
                format!("REFRESHER_REFRESH_RATE_MS must be a number. Got: {}", value)
            })?;
        }
        if let Some(value) = lookup("REFRESHER_PUBLIC_IP_PROVIDER") {
            refresher.public_ip_provider = value.trim().to_string();
        }
        if let Some(value) = lookup("REFRESHER_TARGET_DOMAIN") {
            refresher.target_domain = value.trim().to_string();
        }
        if let Some(value) = lookup("REFRESHER_MAX_CONVERGENCE_POLLS") {
            refresher.engine.max_convergence_polls = Some(value.trim().parse::<usize>().with_context(|| {
                format!(
                    "REFRESHER_MAX_CONVERGENCE_POLLS must be a number. Got: {}",
                    value
                )
            })?);
        }

        Ok(Self {
            refresher,
            log_level: lookup("REFRESHER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        if self.refresher.target_domain.trim().is_empty() {
            anyhow::bail!(
                "TargetDomain is required. \
                Set it via: export REFRESHER_TARGET_DOMAIN=example.com"
            );
        }

        self.refresher.validate()?;

        if self.refresher.public_ip_provider.starts_with("http://") {
            eprintln!(
                "WARNING: PublicIpProvider uses HTTP (not HTTPS). \
                      The answer decides what DNS records point at. Consider using HTTPS."
            );
        }

        self.max_level()?;
        Ok(())
    }

    /// Map the textual log level to a tracing level
    fn max_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "REFRESHER_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return RefresherExitCode::ConfigError.into();
        }
    };

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return RefresherExitCode::ConfigError.into();
    }

    let log_level = settings.max_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RefresherExitCode::ConfigError.into();
    }

    info!("Starting refresherd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RefresherExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(settings.refresher).await {
            error!("Daemon error: {:#}", e);
            RefresherExitCode::RuntimeError
        } else {
            RefresherExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal or a fatal engine error
async fn run_daemon(config: RefresherConfig) -> Result<()> {
    // Installed first so a failure here aborts before any DNS call.
    let mut signals = ShutdownSignals::install()?;

    let ip_source = HttpIpSource::new(config.public_ip_provider.clone());
    let provider = Route53Provider::from_env().await;
    debug!("Using {:?}", provider);

    let (mut refresher, mut events) =
        Refresher::new(Box::new(ip_source), Box::new(provider), config)?;

    let (trigger, shutdown) = Shutdown::new();
    let signal_task = tokio::spawn(async move {
        let name = signals.recv().await;
        info!("Received shutdown signal: {}", name);
        trigger.trigger();
    });

    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Engine event");
        }
    });

    let result = refresher.run_with_shutdown(shutdown).await;

    signal_task.abort();
    // Dropping the engine closes the event channel.
    drop(refresher);
    if let Err(e) = event_task.await {
        debug!("Event monitor ended abnormally: {}", e);
    }

    result?;
    info!("Shutting down daemon");
    Ok(())
}

/// Process signals that request a shutdown
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?,
            sigint: signal(SignalKind::interrupt())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?,
        })
    }

    /// Wait for SIGTERM or SIGINT and return its name
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Process signals that request a shutdown
///
/// Fallback implementation for non-Unix platforms (CTRL-C only).
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending().await
            }
        }
    }
}
