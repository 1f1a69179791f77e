// # cfddns-core
//
// Core library for the cfddns updater: keeps a zone's address records
// pointed at the machine's current public address.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for discovering the public address once per pass
// - **DnsProvider**: Trait for listing, creating and patching address records
// - **DnsProviderFactory**: Builds verified providers from configuration
// - **Reconciler**: Decides create / update / skip for one hostname
// - **Supervisor**: Runs passes on a timer and hot-reloads the configuration
//
// ## Design Principles
//
// 1. **Remote state is the truth**: every pass diffs against the provider's
//    records; nothing is cached between passes
// 2. **Partial writes**: updates carry only the fields that differ
// 3. **One attempt per pass**: no retries; the next pass is the retry
// 4. **Explicit context**: configuration and provider handle are owned by the
//    supervisor and replaced wholesale on reload

pub mod traits;
pub mod engine;
pub mod supervisor;
pub mod config;
pub mod record;
pub mod fingerprint;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider, DnsProviderFactory};
pub use engine::{DesiredRecord, Reconciler, ReconciliationOutcome, ZoneState};
pub use supervisor::{PassReport, RunMode, Supervisor, SupervisorEvent};
pub use config::{Auth, HostnameSpec, TtlSetting, ZoneConfig};
pub use record::{AddressObservation, NewRecord, RecordPatch, RecordType, RemoteRecord};
pub use fingerprint::ConfigFingerprint;
pub use error::{Error, Result};
