// # HTTP IP Source
//
// This crate provides the HTTP-based public IP source for the refresher.
//
// ## Purpose
//
// Asks a "what is my IP" service (checkip.amazonaws.com by default) for the
// host's public address. The service is expected to answer with the address
// as plain text, optionally followed by a newline.
//
// ## Architecture
//
// One GET per call, no caching and no background polling: the refresh loop
// in refresher-core owns the schedule and the per-request deadline. This
// source only reports transport-level outcomes; parsing and validation of
// the body happen in the engine.

use refresher_core::traits::IpSource;
use refresher_core::{Error, Result};

use std::time::Duration;

/// Default public IP service
pub const DEFAULT_IP_SERVICE: &str = "https://checkip.amazonaws.com";

/// Upper bound for a single request at the HTTP client level
///
/// The engine applies its own, much shorter, deadline on top of this.
const CLIENT_TIMEOUT_SECS: u64 = 10;

/// HTTP-based public IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://checkip.amazonaws.com")
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create with a caller-supplied client
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// URL this source queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpIpSource {
    fn default() -> Self {
        Self::new(DEFAULT_IP_SERVICE)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn fetch(&self) -> Result<String> {
        tracing::debug!("Requesting public IP from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_source(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))
    }

    fn source_name(&self) -> &str {
        &self.url
    }
}
