// # DNS Provider Trait
//
// Defines the interface to the provider's zone and record endpoints.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::{DnsProvider, RecordType};
//
// async fn show(provider: &dyn DnsProvider) -> cfddns_core::Result<()> {
//     for record in provider.list_records(RecordType::A).await? {
//         println!("{} -> {}", record.name, record.content);
//     }
//     Ok(())
// }
// ```

use crate::config::ZoneConfig;
use crate::error::Result;
use crate::record::{NewRecord, RecordPatch, RecordType, RemoteRecord};
use async_trait::async_trait;

/// Authenticated client scoped to a single zone
///
/// A provider is a thin facade over the provider's HTTP API. It decides
/// nothing: whether to create, update or skip a record is owned by
/// [`Reconciler`](crate::engine::Reconciler).
///
/// ## Rules for implementations
///
/// - One HTTP exchange per call (pagination aside); no retries, no backoff.
///   A failed call is reported once and the next pass is the retry.
/// - No caching between calls. Listings are memoized per pass by
///   [`ZoneState`](crate::engine::ZoneState), not by the provider.
/// - Credentials never appear in logs or `Debug` output.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Check that the configured credentials are accepted
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: credentials are valid and active
    /// - `Ok(false)`: the provider rejected them
    /// - `Err(Error)`: the check itself could not be performed
    async fn verify_credentials(&self) -> Result<bool>;

    /// Base domain of the zone (e.g. `example.com`), resolved at construction
    fn base_domain(&self) -> &str;

    /// List every record of the given type in the zone
    async fn list_records(&self, record_type: RecordType) -> Result<Vec<RemoteRecord>>;

    /// Create a record
    ///
    /// # Returns
    ///
    /// The record as stored by the provider
    async fn create_record(&self, record: &NewRecord) -> Result<RemoteRecord>;

    /// Apply a partial update to an existing record
    ///
    /// Only the fields set on `patch` are sent.
    async fn update_record(&self, id: &str, patch: &RecordPatch) -> Result<RemoteRecord>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Builds verified providers from configuration
///
/// The supervisor calls this once at startup and again every time the
/// configuration file changes, so that new credentials or a new zone take
/// effect without a restart.
#[async_trait]
pub trait DnsProviderFactory: Send + Sync {
    /// Create a provider for the zone and credentials in `config`
    ///
    /// Implementations verify the credentials and resolve the zone's base
    /// domain before returning. Any failure here is fatal to the caller.
    async fn connect(&self, config: &ZoneConfig) -> Result<Box<dyn DnsProvider>>;
}
