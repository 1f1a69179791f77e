// # IP Source Trait
//
// Defines the interface for discovering the machine's public address.
//
// ## Implementations
//
// - Trace endpoint over HTTPS: `cfddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::IpSource;
//
// async fn show(source: &dyn IpSource) -> cfddns_core::Result<()> {
//     let observation = source.current().await?;
//     println!("public address: {}", observation);
//     Ok(())
// }
// ```

use crate::error::Result;
use crate::record::AddressObservation;
use async_trait::async_trait;

/// Trait for public address discovery
///
/// The supervisor asks for the address once per pass. Implementations must
/// not cache: every call reflects the address at the time of the call.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public address
    ///
    /// # Returns
    ///
    /// - `Ok(AddressObservation)`: the address and its record type
    /// - `Err(Error)`: if the address could not be determined
    async fn current(&self) -> Result<AddressObservation>;

    /// Source name (for logging/debugging)
    fn source_name(&self) -> &'static str {
        "unknown"
    }
}
