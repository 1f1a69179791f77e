//! Test doubles and common utilities for contract tests
//!
//! The mock provider keeps an in-memory record store that reflects every
//! write, so consecutive passes observe each other's effects the way they
//! would against the real API.

#![allow(dead_code)]

use cfddns_core::error::{Error, Result};
use cfddns_core::supervisor::SupervisorEvent;
use cfddns_core::traits::{DnsProvider, DnsProviderFactory, IpSource};
use cfddns_core::{AddressObservation, NewRecord, RecordPatch, RecordType, RemoteRecord, ZoneConfig};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// A call received by [`MockDnsProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List(RecordType),
    Create(NewRecord),
    Update(String, RecordPatch),
}

/// A mock DnsProvider backed by an in-memory record store
///
/// Clones share the store, the call log and the failure switches.
#[derive(Clone)]
pub struct MockDnsProvider {
    base_domain: String,
    store: Arc<Mutex<Vec<RemoteRecord>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    fail_listing: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    next_id: Arc<AtomicUsize>,
}

impl MockDnsProvider {
    pub fn new(base_domain: &str) -> Self {
        Self {
            base_domain: base_domain.to_string(),
            store: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_listing: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Put a record in the store without logging a call
    pub fn seed(&self, name: &str, content: &str, proxied: bool, ttl: u32) -> RemoteRecord {
        let ip: IpAddr = content.parse().expect("seed content is an address");
        let record = RemoteRecord {
            id: self.allocate_id(),
            name: name.to_string(),
            content: content.to_string(),
            proxied,
            ttl,
            record_type: RecordType::for_ip(&ip),
        };
        self.store.lock().unwrap().push(record.clone());
        record
    }

    /// Snapshot of the store
    pub fn records(&self) -> Vec<RemoteRecord> {
        self.store.lock().unwrap().clone()
    }

    /// Record named `name` of `record_type`, if stored
    pub fn record(&self, name: &str, record_type: RecordType) -> Option<RemoteRecord> {
        self.records()
            .into_iter()
            .find(|r| r.name == name && r.record_type == record_type)
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of list calls received
    pub fn list_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProviderCall::List(_)))
            .count()
    }

    /// Number of create and update calls received
    pub fn mutation_count(&self) -> usize {
        self.calls().len() - self.list_count()
    }

    /// Forget previously logged calls (the store is kept)
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make list calls fail
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make create and update calls fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Same store and switches, different base domain
    pub fn with_base_domain(&self, base_domain: &str) -> Self {
        Self {
            base_domain: base_domain.to_string(),
            ..self.clone()
        }
    }

    fn allocate_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn log(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn verify_credentials(&self) -> Result<bool> {
        Ok(true)
    }

    fn base_domain(&self) -> &str {
        &self.base_domain
    }

    async fn list_records(&self, record_type: RecordType) -> Result<Vec<RemoteRecord>> {
        self.log(ProviderCall::List(record_type));
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::transport("connection reset by peer"));
        }
        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.record_type == record_type)
            .collect())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RemoteRecord> {
        self.log(ProviderCall::Create(record.clone()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "HTTP 500 Internal Server Error"));
        }
        let created = RemoteRecord {
            id: self.allocate_id(),
            name: record.name.clone(),
            content: record.content.clone(),
            proxied: record.proxied,
            ttl: record.ttl,
            record_type: record.record_type,
        };
        self.store.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_record(&self, id: &str, patch: &RecordPatch) -> Result<RemoteRecord> {
        self.log(ProviderCall::Update(id.to_string(), patch.clone()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "HTTP 500 Internal Server Error"));
        }
        let mut store = self.store.lock().unwrap();
        let record = store
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found(format!("record {}", id)))?;
        *record = patch.apply_to(record);
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A factory handing out providers that share one mock store
#[derive(Clone)]
pub struct MockFactory {
    provider: MockDnsProvider,
    connected_zones: Arc<Mutex<Vec<String>>>,
    rejected_zone: Option<String>,
}

impl MockFactory {
    pub fn new(provider: &MockDnsProvider) -> Self {
        Self {
            provider: provider.clone(),
            connected_zones: Arc::new(Mutex::new(Vec::new())),
            rejected_zone: None,
        }
    }

    /// Fail `connect` with an authentication error for this zone id
    pub fn rejecting_zone(mut self, zone_id: &str) -> Self {
        self.rejected_zone = Some(zone_id.to_string());
        self
    }

    /// Zone ids of every successful connect, in order
    pub fn connected_zones(&self) -> Vec<String> {
        self.connected_zones.lock().unwrap().clone()
    }

    /// Number of successful connects
    pub fn connect_count(&self) -> usize {
        self.connected_zones.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DnsProviderFactory for MockFactory {
    async fn connect(&self, config: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
        if self.rejected_zone.as_deref() == Some(config.zone_id.as_str()) {
            return Err(Error::auth("API token validation failed"));
        }
        config.credentials()?;
        self.connected_zones
            .lock()
            .unwrap()
            .push(config.zone_id.clone());
        Ok(Box::new(self.provider.clone()))
    }
}

/// An IpSource that replays scripted answers, repeating the last one
#[derive(Clone)]
pub struct ScriptedIpSource {
    answers: Arc<Mutex<VecDeque<std::result::Result<IpAddr, String>>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn sequence(answers: Vec<std::result::Result<&str, &str>>) -> Self {
        let answers = answers
            .into_iter()
            .map(|a| match a {
                Ok(ip) => Ok(ip.parse().expect("scripted address")),
                Err(msg) => Err(msg.to_string()),
            })
            .collect();
        Self {
            answers: Arc::new(Mutex::new(answers)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fixed(ip: &str) -> Self {
        Self::sequence(vec![Ok(ip)])
    }

    pub fn failing(msg: &str) -> Self {
        Self::sequence(vec![Err(msg)])
    }

    /// Number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<AddressObservation> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.len() > 1 {
            answers.pop_front()
        } else {
            answers.front().cloned()
        };
        match answer {
            Some(Ok(ip)) => Ok(AddressObservation::new(ip)),
            Some(Err(msg)) => Err(Error::address(msg)),
            None => Err(Error::address("no scripted answer")),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Observation for an address literal
pub fn observed(ip: &str) -> AddressObservation {
    AddressObservation::new(ip.parse().expect("valid address"))
}

/// Configuration document for `zone_id` with (name, proxied, ttl) entries
pub fn config_yaml(zone_id: &str, hostnames: &[(&str, bool, &str)]) -> String {
    let mut yaml = format!("auth:\n  api_token: \"test-token\"\nzone_id: \"{}\"\nsubdomains:\n", zone_id);
    for (name, proxied, ttl) in hostnames {
        yaml.push_str(&format!("  \"{}\": {{ proxied: {}, ttl: {} }}\n", name, proxied, ttl));
    }
    yaml
}

/// Replace the file content in one step so readers never see a partial write
pub fn write_config(path: &Path, content: &str) {
    let staging = path.with_extension("staging");
    std::fs::write(&staging, content).expect("write staging config");
    std::fs::rename(&staging, path).expect("swap config into place");
}

/// Create `config.yaml` in `dir` with `content`
pub fn config_file(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    write_config(&path, content);
    path
}

/// Wait for the first event matching `pred`, skipping others
pub async fn wait_for_event<F>(
    rx: &mut mpsc::Receiver<SupervisorEvent>,
    mut pred: F,
) -> SupervisorEvent
where
    F: FnMut(&SupervisorEvent) -> bool,
{
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match rx.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("event channel closed before the expected event"),
            }
        }
    })
    .await
    .expect("expected event within 5 seconds")
}
