//! Public IP resolution
//!
//! One request per attempt, raced against a fixed deadline. Transport
//! failures and timeouts are "no result" (the caller keeps its previous
//! address); a response that is not an IPv4 address is fatal.

use crate::error::{Error, Result};
use crate::shutdown::Shutdown;
use crate::traits::IpSource;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{error, info, warn};

/// Resolves the host's public IPv4 address through an [`IpSource`]
pub struct IpResolver {
    source: Box<dyn IpSource>,
    timeout: Duration,
}

impl IpResolver {
    /// Create a resolver racing every fetch against `timeout`
    pub fn new(source: Box<dyn IpSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Resolve the current public address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(addr))`: The provider answered with an IPv4 address
    /// - `Ok(None)`: Timeout, transport failure or empty body
    /// - `Err(Error::InvalidAddress | Error::NotIpv4)`: Unusable answer
    /// - `Err(Error::Cancelled)`: Shutdown fired while waiting
    pub async fn resolve(&self, shutdown: &Shutdown) -> Result<Option<Ipv4Addr>> {
        // The timeout drops the fetch future when it fires.
        let attempt = shutdown
            .guard(async { Ok(tokio::time::timeout(self.timeout, self.source.fetch()).await) })
            .await?;

        let body = match attempt {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                error!(
                    "External IP provider {} refused connection: {}",
                    self.source.source_name(),
                    e
                );
                return Ok(None);
            }
            Err(_) => {
                warn!(
                    "External IP provider {} timed out after {:?} (might have an IP change)",
                    self.source.source_name(),
                    self.timeout
                );
                return Ok(None);
            }
        };

        let body = body.trim();
        if body.is_empty() {
            warn!(
                "External IP provider {} returned an empty response",
                self.source.source_name()
            );
            return Ok(None);
        }

        info!("Got IP {} from provider", body);
        parse_ipv4(body).map(Some)
    }
}

/// Parse a textual address, accepting IPv4 only
pub fn parse_ipv4(text: &str) -> Result<Ipv4Addr> {
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => Ok(addr),
        Ok(addr @ IpAddr::V6(_)) => {
            error!(
                "Parsed IP {} appears to not be an IPv4 address, consider changing providers!",
                addr
            );
            Err(Error::NotIpv4(addr))
        }
        Err(_) => {
            error!(
                "Could not parse {:?}! Consider using another public IP provider",
                text
            );
            Err(Error::InvalidAddress(text.to_string()))
        }
    }
}
