//! Reconciliation engine
//!
//! The [`Reconciler`] brings one hostname's address record in line with the
//! desired state:
//!
//! ```text
//! HostnameSpec ──► DesiredRecord ──┐
//!                                  ▼
//!   AddressObservation ──► ┌──────────────┐ ◄── ZoneState (listing per type)
//!                          │  Reconciler  │
//!                          └──────────────┘
//!                                  │
//!              ┌───────────────────┼───────────────────┐
//!              ▼                   ▼                   ▼
//!          create (POST)     update (PATCH)        unchanged
//! ```
//!
//! ## Decision
//!
//! 1. Normalize the hostname into a fully-qualified name
//! 2. List records of the observation's type (once per pass, see [`ZoneState`])
//! 3. Matching record: diff content, proxied and TTL; patch only what changed
//! 4. No matching record: create one
//!
//! A failed listing is treated like an empty one and the hostname goes down
//! the create path. It is logged as a failure, and [`ZoneState`] keeps the
//! distinction for callers that care.

mod diff;
mod name;
mod zone_state;

pub use diff::RecordDiff;
pub use name::fully_qualified_name;
pub use zone_state::{LookupStatus, ZoneState};

use crate::config::HostnameSpec;
use crate::record::{AddressObservation, NewRecord};
use crate::traits::DnsProvider;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Desired state of a hostname with its TTL already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    /// Label or fully-qualified name as configured
    pub name: String,
    /// Whether the record should be proxied
    pub proxied: bool,
    /// Normalized TTL (`1` = provider-managed)
    pub ttl: u32,
}

impl DesiredRecord {
    /// Normalize a configured hostname
    pub fn from_spec(spec: &HostnameSpec) -> Self {
        Self {
            name: spec.name.clone(),
            proxied: spec.proxied,
            ttl: spec.effective_ttl(),
        }
    }
}

/// What reconciling one hostname did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// A new record was created
    Created,
    /// An existing record was patched
    Updated,
    /// The record already matched; nothing was sent
    Unchanged,
    /// The create or update call failed
    Failed(String),
}

impl ReconciliationOutcome {
    /// Whether a record was written
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }

    /// Whether the hostname could not be reconciled
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Reconciles hostnames against one provider
///
/// Borrowed per pass from the supervisor's current provider handle, so a
/// configuration reload never leaves a reconciler pointing at stale
/// credentials.
pub struct Reconciler<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over `provider`
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Bring one hostname in line with the desired state
    ///
    /// Issues at most one listing call (if `zone` has not listed the
    /// observation's type yet) and at most one mutation. Never retries.
    pub async fn reconcile(
        &self,
        desired: &DesiredRecord,
        observation: &AddressObservation,
        zone: &mut ZoneState,
    ) -> ReconciliationOutcome {
        let fqdn = fully_qualified_name(&desired.name, zone.base_domain());
        let record_type = observation.record_type;

        zone.ensure_listed(self.provider, record_type).await;

        if let Some(existing) = zone.find(record_type, &fqdn).cloned() {
            let diff = RecordDiff::between(&existing, desired, observation);
            if diff.is_empty() {
                info!(
                    "DNS record {} with address {} already up-to-date.",
                    fqdn, existing.content
                );
                return ReconciliationOutcome::Unchanged;
            }

            let patch = diff.to_patch(desired, observation);
            info!("Updating record for {} ({})", fqdn, diff);
            debug!("Patch for {}: {:?}", existing.id, patch);

            return match self.provider.update_record(&existing.id, &patch).await {
                Ok(updated) => {
                    zone.record_written(updated);
                    ReconciliationOutcome::Updated
                }
                Err(e) => {
                    error!("Failed to update DNS record for {}: {}", fqdn, e);
                    ReconciliationOutcome::Failed(e.to_string())
                }
            };
        }

        match zone.lookup_error(record_type) {
            Some(reason) => warn!(
                "Could not list {} records ({}); attempting to create {} anyway",
                record_type, reason, fqdn
            ),
            None => info!("Creating new record for {}", fqdn),
        }

        let record = NewRecord {
            record_type,
            name: fqdn.clone(),
            content: observation.content(),
            proxied: desired.proxied,
            ttl: desired.ttl,
        };

        match self.provider.create_record(&record).await {
            Ok(created) => {
                zone.record_written(created);
                ReconciliationOutcome::Created
            }
            Err(e) => {
                error!("Failed to create DNS record for {}: {}", fqdn, e);
                ReconciliationOutcome::Failed(e.to_string())
            }
        }
    }
}
