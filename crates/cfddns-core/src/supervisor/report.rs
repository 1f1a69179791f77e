//! Per-pass reporting

use crate::engine::ReconciliationOutcome;
use crate::record::AddressObservation;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Result of one full pass over the configured hostnames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// Address the pass reconciled against
    pub observation: AddressObservation,
    /// Outcome per hostname, in configuration order
    pub outcomes: Vec<(String, ReconciliationOutcome)>,
}

impl PassReport {
    /// Number of records created or updated
    pub fn changes(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_change()).count()
    }

    /// Number of hostnames whose create or update failed
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }

    /// Outcome for a configured hostname
    pub fn outcome(&self, name: &str) -> Option<&ReconciliationOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
    }

    /// Log the pass summary
    pub fn log_summary(&self) {
        let changes = self.changes();
        if changes > 0 {
            info!(
                "Done - {} DNS record{} updated or created.",
                changes,
                plural(changes)
            );
        } else {
            info!("All DNS records up-to-date. No updates necessary.");
        }

        let failures = self.failures();
        if failures > 0 {
            warn!(
                "{} hostname{} could not be reconciled this pass",
                failures,
                plural(failures)
            );
        }
    }
}

pub(crate) fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
