//! Zone discovery and the zone → address record cache

use crate::error::{Error, Result};
use crate::shutdown::Shutdown;
use crate::traits::{AddressRecord, DnsProvider, ManagedZone};
use tracing::{error, info, warn};

/// A managed zone together with the address record tracked for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedZone {
    pub zone: ManagedZone,
    pub record: AddressRecord,
}

/// One tracked address record per matching zone, in discovery order
///
/// Keys are unique by zone id. Built once at startup and never re-queried,
/// so zones added or removed at the provider later are not noticed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneRecordCache {
    entries: Vec<CachedZone>,
}

impl ZoneRecordCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `record` for `zone`
    ///
    /// Returns `false` and leaves the cache untouched if the zone is
    /// already tracked.
    pub fn insert(&mut self, zone: ManagedZone, record: AddressRecord) -> bool {
        if self.get(&zone.id).is_some() {
            return false;
        }
        self.entries.push(CachedZone { zone, record });
        true
    }

    /// Look up the entry for a zone id
    pub fn get(&self, zone_id: &str) -> Option<&CachedZone> {
        self.entries.iter().find(|entry| entry.zone.id == zone_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedZone> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CachedZone> {
        self.entries.iter_mut()
    }
}

/// Build the cache of zones whose name contains `target_domain`
///
/// # Errors
///
/// - [`Error::ZoneListing`] if the zones cannot be listed at all
/// - the provider error if a matching zone's records cannot be listed
///
/// No matching zone is not an error: the cache is simply empty.
pub async fn discover(
    provider: &dyn DnsProvider,
    target_domain: &str,
    shutdown: &Shutdown,
) -> Result<ZoneRecordCache> {
    let zones = match shutdown.guard(provider.list_zones()).await {
        Ok(zones) => zones,
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(e) => {
            error!(
                "{} could not list hosted zones (does the credential allow route53:ListHostedZones?): {}",
                provider.provider_name(),
                e
            );
            return Err(Error::zone_listing(e.to_string()));
        }
    };

    let matching: Vec<ManagedZone> = zones
        .into_iter()
        .filter(|zone| zone.name.contains(target_domain))
        .collect();

    let mut cache = ZoneRecordCache::new();

    if matching.is_empty() {
        error!(
            "No valid zones matched {}! No DNS records will be updated!",
            target_domain
        );
        return Ok(cache);
    }

    for zone in matching {
        let records = shutdown
            .guard(provider.list_records(&zone.id))
            .await
            .inspect_err(|e| {
                if !e.is_cancelled() {
                    error!("Could not list records of zone {}: {}", zone.name, e);
                }
            })?;

        let mut address_records = records.iter().filter(|r| r.record_type.is_address());
        let mut unusable = 0;
        let listed = loop {
            match address_records.next() {
                Some(listed) if listed.is_trackable() => break Some(listed),
                Some(listed) => {
                    warn!(
                        "A record {} in zone {} is an alias or has no values, it will not be updated",
                        listed.name, zone.name
                    );
                    unusable += 1;
                }
                None => break None,
            }
        };

        let Some(listed) = listed else {
            if unusable == 0 {
                info!("Zone {} has no A record, skipping it", zone.name);
            } else {
                warn!("Zone {} has no updatable A record, skipping it", zone.name);
            }
            continue;
        };

        // Known limitation: only the first updatable A record set, and only
        // its first value, is tracked. Other values are carried unchanged.
        let others = address_records.count();
        if others > 0 {
            warn!(
                "Zone {} has {} more A record(s); only {} is tracked",
                zone.name, others, listed.name
            );
        }
        if listed.values.len() > 1 {
            warn!(
                "Record {} has {} values; only the first is compared and replaced",
                listed.name,
                listed.values.len()
            );
        }

        let Some(record) = AddressRecord::from_listing(zone.id.clone(), listed) else {
            continue;
        };
        info!(
            "Got zone {} & target record {} w/ val {}",
            zone.name, record.name, record.value
        );

        let zone_name = zone.name.clone();
        if !cache.insert(zone, record) {
            warn!("Zone {} listed twice, keeping the first entry", zone_name);
        }
    }

    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RecordType;

    fn record(zone_id: &str, name: &str, value: &str) -> AddressRecord {
        AddressRecord {
            zone_id: zone_id.to_string(),
            name: name.to_string(),
            record_type: RecordType::A,
            value: value.to_string(),
            other_values: Vec::new(),
            ttl: Some(300),
            set_identifier: None,
        }
    }

    #[test]
    fn first_insert_per_zone_wins() {
        let mut cache = ZoneRecordCache::new();
        let zone = ManagedZone::new("Z1", "example.com.");

        assert!(cache.insert(zone.clone(), record("Z1", "example.com.", "203.0.113.1")));
        assert!(!cache.insert(zone, record("Z1", "www.example.com.", "203.0.113.2")));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Z1").unwrap().record.name, "example.com.");
    }

    #[test]
    fn iteration_keeps_discovery_order() {
        let mut cache = ZoneRecordCache::new();
        cache.insert(
            ManagedZone::new("Z2", "b.example.com."),
            record("Z2", "b.example.com.", "203.0.113.1"),
        );
        cache.insert(
            ManagedZone::new("Z1", "a.example.com."),
            record("Z1", "a.example.com.", "203.0.113.1"),
        );

        let ids: Vec<&str> = cache.iter().map(|e| e.zone.id.as_str()).collect();
        assert_eq!(ids, ["Z2", "Z1"]);
    }
}
