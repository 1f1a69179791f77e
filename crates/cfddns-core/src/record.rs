//! Address records as observed locally and as reported by the provider

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// TTL value meaning "let the provider decide"
pub const AUTO_TTL: u32 = 1;

/// Address record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Record type that can hold the given address
    pub fn for_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The machine's public address as seen during one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressObservation {
    /// The observed address
    pub ip: IpAddr,
    /// Record type matching the address family
    pub record_type: RecordType,
}

impl AddressObservation {
    /// Classify an address into an observation
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            record_type: RecordType::for_ip(&ip),
        }
    }

    /// Address in the textual form used as record content
    pub fn content(&self) -> String {
        self.ip.to_string()
    }
}

impl fmt::Display for AddressObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ip, self.record_type)
    }
}

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Provider-assigned identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the address)
    pub content: String,
    /// Whether traffic goes through the provider's edge
    #[serde(default)]
    pub proxied: bool,
    /// Time-to-live; `1` means provider-managed
    pub ttl: u32,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
}

/// Fields of a record to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the address)
    pub content: String,
    /// Proxied flag
    pub proxied: bool,
    /// Time-to-live
    pub ttl: u32,
}

/// Partial update of an existing record.
///
/// Only the populated fields are sent; everything else on the remote record
/// (comments, tags) is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordPatch {
    /// New content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New proxied flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    /// New TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl RecordPatch {
    /// The record as it will look once the patch is applied
    pub fn apply_to(&self, record: &RemoteRecord) -> RemoteRecord {
        RemoteRecord {
            content: self.content.clone().unwrap_or_else(|| record.content.clone()),
            proxied: self.proxied.unwrap_or(record.proxied),
            ttl: self.ttl.unwrap_or(record.ttl),
            ..record.clone()
        }
    }
}
