//! Field-level comparison of a remote record against desired state

use super::DesiredRecord;
use crate::record::{AddressObservation, RecordPatch, RemoteRecord};
use std::fmt;
use std::net::IpAddr;

/// Which fields of an existing record differ from what we want
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordDiff {
    /// Remote content differs from the observed address
    pub content_changed: bool,
    /// Remote proxied flag differs from the desired one
    pub proxied_changed: bool,
    /// Remote TTL differs and TTL is ours to manage
    pub ttl_changed: bool,
}

impl RecordDiff {
    /// Compare a remote record against the desired state.
    ///
    /// TTL only counts when neither side is proxied. A proxied record carries
    /// a provider-assigned TTL, and comparing against it would flag a change
    /// on every pass.
    pub fn between(
        remote: &RemoteRecord,
        desired: &DesiredRecord,
        observation: &AddressObservation,
    ) -> Self {
        Self {
            content_changed: !same_address(&remote.content, observation),
            proxied_changed: remote.proxied != desired.proxied,
            ttl_changed: !remote.proxied && !desired.proxied && remote.ttl != desired.ttl,
        }
    }

    /// True when no field needs to change
    pub fn is_empty(&self) -> bool {
        !(self.content_changed || self.proxied_changed || self.ttl_changed)
    }

    /// Partial update carrying only the changed fields
    pub fn to_patch(&self, desired: &DesiredRecord, observation: &AddressObservation) -> RecordPatch {
        RecordPatch {
            content: self.content_changed.then(|| observation.content()),
            proxied: self.proxied_changed.then_some(desired.proxied),
            ttl: self.ttl_changed.then_some(desired.ttl),
        }
    }
}

impl fmt::Display for RecordDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = [
            (self.content_changed, "content"),
            (self.proxied_changed, "proxied"),
            (self.ttl_changed, "ttl"),
        ]
        .iter()
        .filter(|(changed, _)| *changed)
        .map(|(_, name)| *name)
        .collect();

        if fields.is_empty() {
            f.write_str("no changes")
        } else {
            f.write_str(&fields.join(", "))
        }
    }
}

// IPv6 content may come back in a different textual form than we send
fn same_address(content: &str, observation: &AddressObservation) -> bool {
    match content.trim().parse::<IpAddr>() {
        Ok(ip) => ip == observation.ip,
        Err(_) => content == observation.content(),
    }
}
