// # IP Source Trait
//
// Defines the interface for asking an external service which public address
// this host is seen with.
//
// ## Implementations
//
// - HTTP GET against a "what is my IP" endpoint: `refresher-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use refresher_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     // Raw response body, e.g. "203.0.113.9\n"
//     let body = source.fetch().await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for IP source implementations
///
/// An IP source performs exactly one outbound request per call and hands
/// back the raw response body. It does not parse, validate, time out or
/// retry: all of that is owned by [`IpResolver`](crate::engine::IpResolver),
/// which races `fetch()` against its own deadline and drops the future when
/// the deadline wins.
///
/// # Cancellation
///
/// Implementations must be cancellation-safe: dropping the returned future
/// at any await point must not leave background work behind.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public address as reported by the service
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The response body, untrimmed
    /// - `Err(Error)`: Connection failure, DNS failure or non-2xx status
    async fn fetch(&self) -> Result<String, crate::Error>;

    /// Where the address is fetched from (for logging)
    fn source_name(&self) -> &str;
}
