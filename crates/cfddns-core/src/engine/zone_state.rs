//! Per-pass view of the zone's records

use crate::record::{RecordType, RemoteRecord};
use crate::traits::DnsProvider;
use std::collections::HashMap;
use tracing::{debug, warn};

/// How the listing of one record type went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStatus {
    /// The provider answered; the listing may still be empty
    Listed,
    /// The listing call failed; no records are known
    Failed(String),
}

#[derive(Debug, Clone)]
struct Listing {
    status: LookupStatus,
    records: Vec<RemoteRecord>,
}

/// Remote records seen during one pass
///
/// Each record type is listed at most once per pass, the first time a
/// hostname needs it. Writes made during the pass are folded back in so
/// later hostnames see them. A new `ZoneState` is created for every pass.
#[derive(Debug, Clone)]
pub struct ZoneState {
    base_domain: String,
    listings: HashMap<RecordType, Listing>,
}

impl ZoneState {
    /// Empty state for a zone
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into(),
            listings: HashMap::new(),
        }
    }

    /// Base domain of the zone
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// List `record_type` through the provider unless already done this pass
    pub async fn ensure_listed(&mut self, provider: &dyn DnsProvider, record_type: RecordType) {
        if self.listings.contains_key(&record_type) {
            return;
        }

        let listing = match provider.list_records(record_type).await {
            Ok(records) => {
                if records.is_empty() {
                    debug!("No existing {} records in zone {}", record_type, self.base_domain);
                } else {
                    debug!("Fetched {} {} record(s)", records.len(), record_type);
                }
                Listing {
                    status: LookupStatus::Listed,
                    records,
                }
            }
            Err(e) => {
                warn!("Error getting {} records for {}: {}", record_type, self.base_domain, e);
                Listing {
                    status: LookupStatus::Failed(e.to_string()),
                    records: Vec::new(),
                }
            }
        };

        self.listings.insert(record_type, listing);
    }

    /// Outcome of listing `record_type`, if it was listed this pass
    pub fn lookup_status(&self, record_type: RecordType) -> Option<&LookupStatus> {
        self.listings.get(&record_type).map(|l| &l.status)
    }

    /// Why listing `record_type` failed, if it did
    pub fn lookup_error(&self, record_type: RecordType) -> Option<&str> {
        match self.lookup_status(record_type) {
            Some(LookupStatus::Failed(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Known records of `record_type`
    pub fn records(&self, record_type: RecordType) -> &[RemoteRecord] {
        self.listings
            .get(&record_type)
            .map(|l| l.records.as_slice())
            .unwrap_or_default()
    }

    /// Record of `record_type` named `fqdn`, if any
    pub fn find(&self, record_type: RecordType, fqdn: &str) -> Option<&RemoteRecord> {
        self.records(record_type)
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(fqdn))
    }

    /// Fold a record returned by a create or update back into the listing
    pub fn record_written(&mut self, record: RemoteRecord) {
        let listing = self
            .listings
            .entry(record.record_type)
            .or_insert_with(|| Listing {
                status: LookupStatus::Listed,
                records: Vec::new(),
            });

        match listing.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => listing.records.push(record),
        }
    }
}
