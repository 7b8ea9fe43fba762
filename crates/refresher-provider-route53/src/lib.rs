// # Route53 DNS Provider
//
// This crate provides the AWS Route53 implementation of the refresher's
// `DnsProvider` trait.
//
// ## Behavior
//
// - One provider call per trait call (pagination aside): no retry and no
//   backoff. The engine owns all scheduling.
// - Listed record sets are remembered whole. An UPSERT starts from the
//   remembered set and swaps only its first value, so TTL, routing policy
//   (set identifier, weight, region, geo), health check and the remaining
//   round-robin values are written back as they were listed.
// - Hosted zone and record set listings follow Route53's pagination
//   markers until the listing is complete.
// - Changes are single-record UPSERT batches; their status is reported as
//   PENDING until Route53 says INSYNC.
//
// ## Credentials
//
// Resolved by the AWS SDK's default chain (environment, shared profile,
// instance or container role). Nothing credential-related is stored here
// or logged.
//
// ## API Reference
//
// - Route53 API 2013-04-01: https://docs.aws.amazon.com/Route53/latest/APIReference/
// - ListHostedZones, ListResourceRecordSets, ChangeResourceRecordSets, GetChange

use async_trait::async_trait;
use aws_sdk_route53::error::{BuildError, DisplayErrorContext};
use aws_sdk_route53::types as r53;
use refresher_core::traits::{
    ChangeAction, ChangeId, ChangeRequest, ChangeStatus, DnsProvider, ManagedZone, RecordType,
    ResourceRecord,
};
use refresher_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Provider name used in errors and logs
const PROVIDER: &str = "route53";

/// TTL applied when a cached record carries none
pub const DEFAULT_TTL: i64 = 300;

/// AWS Route53 DNS provider
///
/// Clones share the SDK client and the remembered record sets.
#[derive(Clone)]
pub struct Route53Provider {
    client: aws_sdk_route53::Client,
    listed: ListedSets,
}

// Custom Debug implementation: the SDK client carries the credential chain
impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Provider")
            .field(
                "region",
                &self.client.config().region().map(|r| r.to_string()),
            )
            .field("credentials", &"<REDACTED>")
            .finish()
    }
}

impl Route53Provider {
    /// Create a provider from the ambient AWS configuration
    ///
    /// Region and credentials are resolved the same way the AWS CLI does.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        tracing::debug!(
            region = ?config.region().map(|r| r.to_string()),
            "Loaded AWS configuration"
        );
        Self::from_client(aws_sdk_route53::Client::new(&config))
    }

    /// Create a provider around an existing SDK client
    pub fn from_client(client: aws_sdk_route53::Client) -> Self {
        Self {
            client,
            listed: ListedSets::default(),
        }
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    async fn list_zones(&self) -> Result<Vec<ManagedZone>> {
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(sdk_error)?;

            zones.extend(
                page.hosted_zones()
                    .iter()
                    .map(|zone| ManagedZone::new(zone.id(), zone.name())),
            );

            match page.next_marker() {
                Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        tracing::debug!("Listed {} hosted zone(s)", zones.len());
        Ok(zones)
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        let mut start: Option<RecordCursor> = None;

        loop {
            let cursor = start.take().unwrap_or_default();
            let page = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(zone_id)
                .set_start_record_name(cursor.name)
                .set_start_record_type(cursor.record_type)
                .set_start_record_identifier(cursor.identifier)
                .send()
                .await
                .map_err(sdk_error)?;

            for set in page.resource_record_sets() {
                records.push(to_resource_record(set));
                self.listed.remember(zone_id, set.clone()).await;
            }

            if !page.is_truncated() || page.next_record_name().is_none() {
                break;
            }
            start = Some(RecordCursor {
                name: page.next_record_name().map(str::to_string),
                record_type: page.next_record_type().cloned(),
                identifier: page.next_record_identifier().map(str::to_string),
            });
        }

        tracing::debug!("Listed {} record set(s) in zone {}", records.len(), zone_id);
        Ok(records)
    }

    async fn submit_change(&self, change: &ChangeRequest) -> Result<ChangeId> {
        let listed = self.listed.lookup(change).await;
        if listed.is_none() {
            tracing::debug!(
                "No listed record set for {}, building the change from the tracked record",
                change.record.name
            );
        }
        let record_set = to_record_set(change, listed)?;
        let batch = to_change_batch(change, record_set.clone())?;

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(&change.zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(sdk_error)?;

        let info = output
            .change_info()
            .ok_or_else(|| Error::provider(PROVIDER, "ChangeResourceRecordSets returned no ChangeInfo"))?;

        tracing::debug!(
            "Change {} submitted for {} (status {})",
            info.id(),
            change.record.name,
            info.status().as_str()
        );
        self.listed.remember(&change.zone_id, record_set).await;
        Ok(ChangeId::new(info.id()))
    }

    async fn change_status(&self, change_id: &ChangeId) -> Result<ChangeStatus> {
        let output = self
            .client
            .get_change()
            .id(change_id.as_str())
            .send()
            .await
            .map_err(sdk_error)?;

        let info = output
            .change_info()
            .ok_or_else(|| Error::provider(PROVIDER, "GetChange returned no ChangeInfo"))?;

        Ok(to_change_status(info.status()))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Where the next page of a record set listing starts
#[derive(Debug, Default)]
struct RecordCursor {
    name: Option<String>,
    record_type: Option<r53::RrType>,
    identifier: Option<String>,
}

/// Identity of a record set within Route53
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordKey {
    zone_id: String,
    name: String,
    record_type: String,
    set_identifier: Option<String>,
}

impl RecordKey {
    fn of_set(zone_id: &str, set: &r53::ResourceRecordSet) -> Self {
        Self {
            zone_id: zone_id.to_string(),
            name: set.name().to_string(),
            record_type: set.r#type().as_str().to_string(),
            set_identifier: set.set_identifier().map(str::to_string),
        }
    }

    fn of_change(change: &ChangeRequest) -> Self {
        Self {
            zone_id: change.zone_id.clone(),
            name: change.record.name.clone(),
            record_type: change.record.record_type.as_str().to_string(),
            set_identifier: change.record.set_identifier.clone(),
        }
    }
}

/// Record sets as last listed or written, keyed by zone and identity
#[derive(Debug, Clone, Default)]
struct ListedSets(Arc<Mutex<HashMap<RecordKey, r53::ResourceRecordSet>>>);

impl ListedSets {
    async fn remember(&self, zone_id: &str, set: r53::ResourceRecordSet) {
        let key = RecordKey::of_set(zone_id, &set);
        self.0.lock().await.insert(key, set);
    }

    async fn lookup(&self, change: &ChangeRequest) -> Option<r53::ResourceRecordSet> {
        self.0.lock().await.get(&RecordKey::of_change(change)).cloned()
    }
}

fn sdk_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::provider(PROVIDER, DisplayErrorContext(&err).to_string())
}

fn build_error(err: BuildError) -> Error {
    Error::provider(PROVIDER, format!("Invalid change request: {}", err))
}

fn to_resource_record(set: &r53::ResourceRecordSet) -> ResourceRecord {
    ResourceRecord {
        name: set.name().to_string(),
        record_type: RecordType::from(set.r#type().as_str()),
        ttl: set.ttl(),
        values: set
            .resource_records()
            .iter()
            .map(|rr| rr.value().to_string())
            .collect(),
        set_identifier: set.set_identifier().map(str::to_string),
        alias_target: set.alias_target().map(|alias| alias.dns_name().to_string()),
    }
}

/// The record set to UPSERT for `change`
///
/// With the listed set at hand only its first value is replaced. Without it
/// the set is rebuilt from the tracked record, keeping every value it holds.
fn to_record_set(
    change: &ChangeRequest,
    listed: Option<r53::ResourceRecordSet>,
) -> Result<r53::ResourceRecordSet> {
    let record = &change.record;

    let Some(mut set) = listed else {
        let mut builder = r53::ResourceRecordSet::builder()
            .name(&record.name)
            .r#type(r53::RrType::from(record.record_type.as_str()))
            .ttl(record.ttl.unwrap_or(DEFAULT_TTL))
            .set_set_identifier(record.set_identifier.clone());
        for value in record.values() {
            builder = builder.resource_records(
                r53::ResourceRecord::builder()
                    .value(value)
                    .build()
                    .map_err(build_error)?,
            );
        }
        return builder.build().map_err(build_error);
    };

    if set.alias_target.is_some() {
        return Err(Error::provider(
            PROVIDER,
            format!("Refusing to rewrite alias record {}", set.name),
        ));
    }

    match set.resource_records.as_mut().and_then(|rrs| rrs.first_mut()) {
        Some(first) => first.value = record.value.clone(),
        None => {
            return Err(Error::provider(
                PROVIDER,
                format!("Record {} has no value to replace", set.name),
            ));
        }
    }
    Ok(set)
}

fn to_change_batch(
    change: &ChangeRequest,
    record_set: r53::ResourceRecordSet,
) -> Result<r53::ChangeBatch> {
    let action = match change.action {
        ChangeAction::Upsert => r53::ChangeAction::Upsert,
    };

    r53::ChangeBatch::builder()
        .comment(&change.comment)
        .changes(
            r53::Change::builder()
                .action(action)
                .resource_record_set(record_set)
                .build()
                .map_err(build_error)?,
        )
        .build()
        .map_err(build_error)
}

fn to_change_status(status: &r53::ChangeStatus) -> ChangeStatus {
    match status {
        r53::ChangeStatus::Insync => ChangeStatus::InSync,
        _ => ChangeStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refresher_core::traits::AddressRecord;

    fn record_set(name: &str, rr_type: r53::RrType, values: &[&str]) -> r53::ResourceRecordSet {
        let mut builder = r53::ResourceRecordSet::builder()
            .name(name)
            .r#type(rr_type)
            .ttl(60);
        for value in values {
            builder = builder.resource_records(r53::ResourceRecord::builder().value(*value).build().unwrap());
        }
        builder.build().unwrap()
    }

    fn weighted_set(values: &[&str]) -> r53::ResourceRecordSet {
        let mut builder = r53::ResourceRecordSet::builder()
            .name("example.com.")
            .r#type(r53::RrType::A)
            .ttl(60)
            .set_identifier("home")
            .weight(10)
            .health_check_id("hc-1");
        for value in values {
            builder = builder.resource_records(r53::ResourceRecord::builder().value(*value).build().unwrap());
        }
        builder.build().unwrap()
    }

    fn alias_set() -> r53::ResourceRecordSet {
        r53::ResourceRecordSet::builder()
            .name("example.com.")
            .r#type(r53::RrType::A)
            .alias_target(
                r53::AliasTarget::builder()
                    .hosted_zone_id("Z2FDTNDATAQYW2")
                    .dns_name("d111111abcdef8.cloudfront.net.")
                    .evaluate_target_health(false)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    /// The change the engine submits after tracking `set` and seeing a new address
    fn upsert_for(set: &r53::ResourceRecordSet, new_value: &str) -> ChangeRequest {
        let mut record = AddressRecord::from_listing("/hostedzone/Z1", &to_resource_record(set)).unwrap();
        record.value = new_value.to_string();
        ChangeRequest::upsert(record, "Refresher auto action @ 2026-01-01 00:00:00 UTC")
    }

    fn values(set: &r53::ResourceRecordSet) -> Vec<&str> {
        set.resource_records().iter().map(|rr| rr.value()).collect()
    }

    #[test]
    fn record_set_converts_with_all_values() {
        let set = record_set("example.com.", r53::RrType::A, &["203.0.113.1", "203.0.113.2"]);

        let record = to_resource_record(&set);

        assert_eq!(record.name, "example.com.");
        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.ttl, Some(60));
        assert_eq!(record.values, ["203.0.113.1", "203.0.113.2"]);
        assert_eq!(record.set_identifier, None);
        assert!(!record.is_alias());
    }

    #[test]
    fn non_address_types_are_preserved() {
        let set = record_set("example.com.", r53::RrType::Ns, &["ns-1.awsdns-01.org."]);

        let record = to_resource_record(&set);

        assert!(!record.record_type.is_address());
        assert_eq!(record.record_type.as_str(), "NS");
    }

    #[test]
    fn round_robin_set_keeps_its_other_values() {
        let listed = record_set("example.com.", r53::RrType::A, &["203.0.113.1", "198.51.100.7"]);
        let change = upsert_for(&listed, "203.0.113.9");

        let set = to_record_set(&change, Some(listed)).unwrap();

        assert_eq!(values(&set), ["203.0.113.9", "198.51.100.7"]);
        assert_eq!(set.ttl(), Some(60));
    }

    #[test]
    fn weighted_set_keeps_its_routing_policy() {
        let listed = weighted_set(&["203.0.113.1"]);
        let change = upsert_for(&listed, "203.0.113.9");

        let set = to_record_set(&change, Some(listed)).unwrap();

        assert_eq!(set.set_identifier(), Some("home"));
        assert_eq!(set.weight(), Some(10));
        assert_eq!(set.health_check_id(), Some("hc-1"));
        assert_eq!(values(&set), ["203.0.113.9"]);
    }

    #[test]
    fn alias_set_is_never_tracked_or_rewritten() {
        let listed = alias_set();

        let record = to_resource_record(&listed);
        assert!(record.is_alias());
        assert_eq!(record.alias_target.as_deref(), Some("d111111abcdef8.cloudfront.net."));
        assert!(AddressRecord::from_listing("/hostedzone/Z1", &record).is_none());

        // Even if handed one, the alias is not turned into a plain A record.
        let stray = upsert_for(&record_set("example.com.", r53::RrType::A, &["203.0.113.1"]), "203.0.113.9");
        let result = to_record_set(&stray, Some(listed));
        assert!(matches!(result, Err(Error::Provider { .. })));
    }

    #[test]
    fn unlisted_record_is_rebuilt_with_all_values() {
        let change = upsert_for(&weighted_set(&["203.0.113.1", "198.51.100.7"]), "203.0.113.9");

        let set = to_record_set(&change, None).unwrap();

        assert_eq!(set.name(), "example.com.");
        assert_eq!(set.r#type(), &r53::RrType::A);
        assert_eq!(set.ttl(), Some(60));
        assert_eq!(set.set_identifier(), Some("home"));
        assert_eq!(values(&set), ["203.0.113.9", "198.51.100.7"]);
    }

    #[test]
    fn unlisted_record_without_ttl_falls_back_to_default() {
        let mut change = upsert_for(&record_set("example.com.", r53::RrType::A, &["203.0.113.1"]), "203.0.113.9");
        change.record.ttl = None;

        let set = to_record_set(&change, None).unwrap();

        assert_eq!(set.ttl(), Some(DEFAULT_TTL));
    }

    #[test]
    fn upsert_batch_carries_one_change() {
        let listed = record_set("example.com.", r53::RrType::A, &["203.0.113.1"]);
        let change = upsert_for(&listed, "203.0.113.9");
        let set = to_record_set(&change, Some(listed)).unwrap();

        let batch = to_change_batch(&change, set).unwrap();

        assert_eq!(batch.comment(), Some("Refresher auto action @ 2026-01-01 00:00:00 UTC"));
        assert_eq!(batch.changes().len(), 1);
        let submitted = &batch.changes()[0];
        assert_eq!(submitted.action(), &r53::ChangeAction::Upsert);
        assert_eq!(values(submitted.resource_record_set().unwrap()), ["203.0.113.9"]);
    }

    #[tokio::test]
    async fn listed_sets_are_found_by_zone_name_and_identifier() {
        let listed = ListedSets::default();
        let weighted = weighted_set(&["203.0.113.1"]);
        let plain = record_set("example.com.", r53::RrType::A, &["198.51.100.7"]);
        listed.remember("/hostedzone/Z1", weighted.clone()).await;
        listed.remember("/hostedzone/Z1", plain.clone()).await;

        let change = upsert_for(&weighted, "203.0.113.9");
        assert_eq!(listed.lookup(&change).await, Some(weighted));

        let change = upsert_for(&plain, "203.0.113.9");
        assert_eq!(listed.lookup(&change).await, Some(plain));

        let mut elsewhere = change.clone();
        elsewhere.zone_id = "/hostedzone/Z2".to_string();
        assert_eq!(listed.lookup(&elsewhere).await, None);
    }

    #[test]
    fn only_insync_counts_as_converged() {
        assert_eq!(to_change_status(&r53::ChangeStatus::Insync), ChangeStatus::InSync);
        assert_eq!(to_change_status(&r53::ChangeStatus::Pending), ChangeStatus::Pending);
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let config = aws_sdk_route53::Config::builder()
            .behavior_version(aws_sdk_route53::config::BehaviorVersion::latest())
            .region(aws_sdk_route53::config::Region::new("us-east-1"))
            .build();
        let provider = Route53Provider::from_client(aws_sdk_route53::Client::from_conf(config));

        let debug = format!("{:?}", provider);

        assert!(debug.contains("us-east-1"));
        assert!(debug.contains("<REDACTED>"));
        assert_eq!(provider.provider_name(), "route53");
    }
}
