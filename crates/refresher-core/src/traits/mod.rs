//! Core traits for the refresher
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Ask an external service for the host's public address
//! - [`DnsProvider`]: List zones and records, submit changes, poll their status

pub mod dns_provider;
pub mod ip_source;

pub use dns_provider::{
    AddressRecord, ChangeAction, ChangeId, ChangeRequest, ChangeStatus, DnsProvider, ManagedZone,
    RecordType, ResourceRecord,
};
pub use ip_source::IpSource;
