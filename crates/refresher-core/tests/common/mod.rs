//! Test doubles and common utilities for refresher contract tests
//!
//! This module provides scripted stand-ins for the IP service and the DNS
//! provider. Both are cheap to clone and clones share their counters, so a
//! test can hand one clone to the engine and keep another for assertions.

#![allow(dead_code)]

use refresher_core::config::RefresherConfig;
use refresher_core::error::{Error, Result};
use refresher_core::traits::{
    ChangeId, ChangeRequest, ChangeStatus, DnsProvider, IpSource, ManagedZone, RecordType,
    ResourceRecord,
};
use refresher_core::{EngineEvent, Refresher};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// What the scripted IP service answers with
#[derive(Debug, Clone)]
pub enum IpReply {
    /// Respond with this body
    Body(&'static str),
    /// Fail like a refused connection
    Refused,
    /// Never respond
    Hang,
}

struct IpScript {
    replies: VecDeque<IpReply>,
    last: IpReply,
}

/// An IpSource that plays back a script, repeating the last reply forever
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<IpScript>>,
    fetch_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(replies: impl IntoIterator<Item = IpReply>) -> Self {
        let replies: VecDeque<IpReply> = replies.into_iter().collect();
        let last = replies.back().cloned().unwrap_or(IpReply::Refused);

        Self {
            script: Arc::new(Mutex::new(IpScript { replies, last })),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer with the same address
    pub fn fixed(body: &'static str) -> Self {
        Self::new([IpReply::Body(body)])
    }

    /// Get the number of times fetch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn fetch(&self) -> Result<String> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let reply = {
            let mut script = self.script.lock().unwrap();
            match script.replies.pop_front() {
                Some(reply) => {
                    script.last = reply.clone();
                    reply
                }
                None => script.last.clone(),
            }
        };

        match reply {
            IpReply::Body(body) => Ok(body.to_string()),
            IpReply::Refused => Err(Error::ip_source("connection refused")),
            IpReply::Hang => std::future::pending().await,
        }
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct ProviderState {
    zones: Vec<ManagedZone>,
    records: HashMap<String, Vec<ResourceRecord>>,
    pending_polls: usize,
    fail_zone_listing: bool,
    fail_submissions: bool,
    fail_status_checks: bool,
    submitted: Vec<ChangeRequest>,
    polls_by_change: HashMap<String, usize>,
    status_queries: usize,
    list_zones_calls: usize,
    list_records_calls: usize,
}

/// A mock DnsProvider that serves canned zones and records a history
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone with its record sets
    pub fn with_zone(self, id: &str, name: &str, records: Vec<ResourceRecord>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.zones.push(ManagedZone::new(id, name));
            state.records.insert(id.to_string(), records);
        }
        self
    }

    /// Report every change as pending this many times before in sync
    pub fn with_pending_polls(self, pending_polls: usize) -> Self {
        self.state.lock().unwrap().pending_polls = pending_polls;
        self
    }

    pub fn failing_zone_listing(self) -> Self {
        self.state.lock().unwrap().fail_zone_listing = true;
        self
    }

    pub fn failing_submissions(self) -> Self {
        self.state.lock().unwrap().fail_submissions = true;
        self
    }

    pub fn failing_status_checks(self) -> Self {
        self.state.lock().unwrap().fail_status_checks = true;
        self
    }

    /// Changes submitted so far, including rejected ones
    pub fn submitted(&self) -> Vec<ChangeRequest> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Get the number of submit_change() calls, including rejected ones
    pub fn submit_count(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    /// Get the number of change_status() calls
    pub fn status_queries(&self) -> usize {
        self.state.lock().unwrap().status_queries
    }

    pub fn list_zones_calls(&self) -> usize {
        self.state.lock().unwrap().list_zones_calls
    }

    pub fn list_records_calls(&self) -> usize {
        self.state.lock().unwrap().list_records_calls
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_zones(&self) -> Result<Vec<ManagedZone>> {
        let mut state = self.state.lock().unwrap();
        state.list_zones_calls += 1;
        if state.fail_zone_listing {
            return Err(Error::provider("mock", "AccessDenied"));
        }
        Ok(state.zones.clone())
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<ResourceRecord>> {
        let mut state = self.state.lock().unwrap();
        state.list_records_calls += 1;
        Ok(state.records.get(zone_id).cloned().unwrap_or_default())
    }

    async fn submit_change(&self, change: &ChangeRequest) -> Result<ChangeId> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(change.clone());
        if state.fail_submissions {
            return Err(Error::provider("mock", "InvalidChangeBatch"));
        }
        Ok(ChangeId::new(format!("/change/C{}", state.submitted.len())))
    }

    async fn change_status(&self, change_id: &ChangeId) -> Result<ChangeStatus> {
        let mut state = self.state.lock().unwrap();
        state.status_queries += 1;
        if state.fail_status_checks {
            return Err(Error::provider("mock", "Throttling"));
        }

        let pending_polls = state.pending_polls;
        let polls = state
            .polls_by_change
            .entry(change_id.to_string())
            .or_insert(0);
        *polls += 1;

        if *polls > pending_polls {
            Ok(ChangeStatus::InSync)
        } else {
            Ok(ChangeStatus::Pending)
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An `A` record set with a single value
pub fn a_record(name: &str, value: &str) -> ResourceRecord {
    record(name, "A", value)
}

/// A record set of any type with a single value
pub fn record(name: &str, record_type: &str, value: &str) -> ResourceRecord {
    ResourceRecord {
        name: name.to_string(),
        record_type: RecordType::from(record_type),
        ttl: Some(300),
        values: vec![value.to_string()],
        set_identifier: None,
        alias_target: None,
    }
}

/// An A record set aliasing another resource, carrying no values
pub fn alias_record(name: &str, target: &str) -> ResourceRecord {
    ResourceRecord {
        name: name.to_string(),
        record_type: RecordType::A,
        ttl: None,
        values: Vec::new(),
        set_identifier: None,
        alias_target: Some(target.to_string()),
    }
}

/// A weighted A record set answering with several addresses
pub fn weighted_record(name: &str, set_identifier: &str, values: &[&str]) -> ResourceRecord {
    ResourceRecord {
        name: name.to_string(),
        record_type: RecordType::A,
        ttl: Some(60),
        values: values.iter().map(|v| v.to_string()).collect(),
        set_identifier: Some(set_identifier.to_string()),
        alias_target: None,
    }
}

/// Buffer collecting formatted log output
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Install a subscriber writing into this buffer for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Everything logged so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Enabled configuration ticking every second
pub fn test_config(target_domain: &str) -> RefresherConfig {
    RefresherConfig::new(target_domain)
        .with_enabled(true)
        .with_refresh_interval_ms(1000)
}

/// Build a refresher over the given doubles
pub fn refresher(
    source: &ScriptedIpSource,
    provider: &MockDnsProvider,
    config: RefresherConfig,
) -> (Refresher, mpsc::Receiver<EngineEvent>) {
    Refresher::new(Box::new(source.clone()), Box::new(provider.clone()), config)
        .expect("refresher construction succeeds")
}

/// Collect every event emitted so far
pub fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
