// # DNS Provider Trait
//
// Defines the minimal surface of an authoritative DNS provider API the
// refresher needs: list zones, list a zone's records, submit an UPSERT and
// poll the status of a submitted change.
//
// ## Implementations
//
// - AWS Route53: `refresher-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use refresher_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for zone in provider.list_zones().await? {
//         let records = provider.list_records(&zone.id).await?;
//         println!("{} has {} record sets", zone.name, records.len());
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;

/// A DNS zone managed by the provider account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedZone {
    /// Provider-assigned zone identifier
    pub id: String,
    /// Zone apex name, usually fully qualified (e.g. "example.com.")
    pub name: String,
}

impl ManagedZone {
    /// Create a new zone description
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
    /// Anything else (CNAME, MX, TXT, ...)
    Other(String),
}

impl RecordType {
    /// Wire representation of the type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Other(other) => other,
        }
    }

    /// Whether this is the record type that carries an IPv4 address
    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A)
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record set as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Fully qualified record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time-to-live in seconds (absent for alias records)
    pub ttl: Option<i64>,
    /// Record values, in provider order (empty for alias records)
    pub values: Vec<String>,
    /// Distinguishes record sets sharing a name and type (weighted,
    /// latency, failover and similar routing policies)
    pub set_identifier: Option<String>,
    /// DNS name an alias record points at
    pub alias_target: Option<String>,
}

impl ResourceRecord {
    /// Whether this set is an alias rather than a set of literal values
    pub fn is_alias(&self) -> bool {
        self.alias_target.is_some()
    }

    /// Whether the refresher can track and rewrite this set
    ///
    /// Only `A` sets holding at least one literal value qualify.
    pub fn is_trackable(&self) -> bool {
        self.record_type.is_address() && !self.is_alias() && !self.values.is_empty()
    }
}

/// The address record tracked for a zone
///
/// The `value` is the textual IPv4 address the record is believed to hold.
/// It is overwritten with the target address right before a change is
/// submitted, so after a successful submission it reflects the target state,
/// not necessarily the confirmed one.
///
/// Only the first value of the listed set is compared and rewritten; the
/// remaining values travel along untouched in `other_values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Owning zone identifier
    pub zone_id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type, always [`RecordType::A`]
    pub record_type: RecordType,
    /// Current textual IPv4 value (the set's first value)
    pub value: String,
    /// Values after the first, in provider order
    pub other_values: Vec<String>,
    /// Time-to-live in seconds
    pub ttl: Option<i64>,
    /// Set identifier of the listed set, if any
    pub set_identifier: Option<String>,
}

impl AddressRecord {
    /// Build the tracked record from a listed record set
    ///
    /// Returns `None` unless the set is [trackable](ResourceRecord::is_trackable).
    pub fn from_listing(zone_id: impl Into<String>, record: &ResourceRecord) -> Option<Self> {
        if !record.is_trackable() {
            return None;
        }

        let (first, rest) = record.values.split_first()?;
        Some(Self {
            zone_id: zone_id.into(),
            name: record.name.clone(),
            record_type: RecordType::A,
            value: first.clone(),
            other_values: rest.to_vec(),
            ttl: record.ttl,
            set_identifier: record.set_identifier.clone(),
        })
    }

    /// Every value of the set, tracked value first
    pub fn values(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.value.as_str()).chain(self.other_values.iter().map(String::as_str))
    }
}

/// Change action sent to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Create the record if absent, replace it if present
    Upsert,
}

/// A change to submit for one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    /// Target zone identifier
    pub zone_id: String,
    /// The record with its new value
    pub record: AddressRecord,
    /// Human-readable comment attached to the change
    pub comment: String,
    /// Change action (always UPSERT)
    pub action: ChangeAction,
}

impl ChangeRequest {
    /// Create an UPSERT for the given record
    pub fn upsert(record: AddressRecord, comment: impl Into<String>) -> Self {
        Self {
            zone_id: record.zone_id.clone(),
            record,
            comment: comment.into(),
            action: ChangeAction::Upsert,
        }
    }
}

/// Provider-assigned identifier of a submitted change
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeId(pub String);

impl ChangeId {
    /// Create a new change identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Propagation status of a submitted change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Not yet applied to all authoritative servers
    Pending,
    /// Applied to all authoritative servers
    InSync,
}

/// Trait for DNS provider implementations
///
/// This trait defines the four provider operations the refresher consumes.
/// Implementations must handle the specifics of each provider's API.
///
/// # Trust Level: Untrusted
///
/// Providers are single-shot: one logical API operation per call, errors
/// returned as-is. They never sleep, retry, poll or decide whether a record
/// is stale; staleness, sequencing and convergence polling are owned by the
/// engine.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every zone visible to the account
    ///
    /// Implementations follow pagination so the result is complete.
    async fn list_zones(&self) -> Result<Vec<ManagedZone>, crate::Error>;

    /// List every record set in a zone
    ///
    /// # Parameters
    ///
    /// - `zone_id`: The zone identifier from [`ManagedZone::id`]
    async fn list_records(&self, zone_id: &str) -> Result<Vec<ResourceRecord>, crate::Error>;

    /// Submit a change and return its provider-assigned identifier
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeId)`: The change was accepted (not necessarily propagated)
    /// - `Err(Error)`: The change was rejected or the request failed
    async fn submit_change(&self, change: &ChangeRequest) -> Result<ChangeId, crate::Error>;

    /// Query the propagation status of a submitted change
    async fn change_status(&self, change_id: &ChangeId) -> Result<ChangeStatus, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
