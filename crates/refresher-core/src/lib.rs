// # refresher-core
//
// Core library keeping DNS address records pointed at the host's public
// IPv4 address.
//
// ## Architecture Overview
//
// This library provides the core functionality for the refresher:
// - **IpSource**: Trait for asking an external service for the public address
// - **DnsProvider**: Trait for listing zones/records and submitting changes
// - **Refresher**: Core engine that resolves, compares, updates and waits for
//   convergence
// - **Shutdown**: Signal observed by every suspension point of the engine
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider crates
// 2. **Fail-Open Resolution**: A flaky IP service never triggers DNS changes
// 3. **Fail-Loud Integrity**: A corrupt address or unreadable account stops
//    the process
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Sequential**: One zone, one change, one poll at a time

pub mod config;
pub mod engine;
pub mod error;
pub mod shutdown;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, RefresherConfig};
pub use engine::{EngineEvent, Refresher, TickOutcome, ZoneRecordCache};
pub use error::{Error, Result};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use traits::{DnsProvider, IpSource};
