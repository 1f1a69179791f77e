// # HTTP Address Source
//
// Discovers the machine's public address by asking an echo endpoint how the
// request arrived. The default endpoint is Cloudflare's trace page, which
// answers in plain `key=value` lines:
//
// ```text
// fl=29f123
// h=1.1.1.1
// ip=203.0.113.7
// ts=1700000000.123
// ...
// ```
//
// The address is the value of the `ip=` line. Its family decides whether the
// pass manages A or AAAA records.
//
// One request per `current()` call; nothing is cached between passes.

use cfddns_core::traits::IpSource;
use cfddns_core::{AddressObservation, Error, Result};

use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Default address echo endpoint
pub const DEFAULT_TRACE_URL: &str = "https://1.1.1.1/cdn-cgi/trace";

/// Environment variable overriding the echo endpoint
pub const TRACE_URL_ENV: &str = "CFDDNS_TRACE_URL";

/// HTTP timeout for the echo request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Address source backed by a `cdn-cgi/trace` style endpoint
#[derive(Debug, Clone)]
pub struct TraceIpSource {
    /// URL to fetch the trace from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl TraceIpSource {
    /// Create a source for `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::address(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Source for `CFDDNS_TRACE_URL`, or the default endpoint
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(TRACE_URL_ENV)
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_TRACE_URL.to_string());
        Self::new(url)
    }

    /// Endpoint this source queries
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_trace(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::address(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::address(format!(
                "{} answered HTTP {}",
                self.url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::address(format!("Failed to read response: {}", e)))
    }
}

#[async_trait::async_trait]
impl IpSource for TraceIpSource {
    async fn current(&self) -> Result<AddressObservation> {
        let body = self.fetch_trace().await?;
        let ip = parse_trace(&body)?;
        debug!("Trace endpoint reported {}", ip);
        Ok(AddressObservation::new(ip))
    }

    fn source_name(&self) -> &'static str {
        "http-trace"
    }
}

/// Extract the address from a trace body
///
/// # Errors
///
/// `Error::AddressResolution` when there is no `ip=` line or its value is not
/// an IPv4/IPv6 literal.
pub fn parse_trace(body: &str) -> Result<IpAddr> {
    let value = body
        .lines()
        .find_map(|line| line.trim().strip_prefix("ip="))
        .ok_or_else(|| Error::address("IP address not found in trace response"))?;

    let value = value.trim();
    value
        .parse()
        .map_err(|_| Error::address(format!("Invalid IP address in trace response: {:?}", value)))
}
