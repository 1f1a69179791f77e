//! Core traits for the cfddns updater
//!
//! This module defines the abstract interfaces the engine and supervisor
//! work against.
//!
//! - [`IpSource`]: Discover the public address
//! - [`DnsProvider`]: Read and write address records in one zone
//! - [`DnsProviderFactory`]: Build verified providers from configuration

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, DnsProviderFactory};
