// # Cloudflare Provider Client
//
// Talks to the Cloudflare API v4 on behalf of one zone.
//
// ## Behavior
//
// - One HTTP request per operation (list pages aside); no retries, no backoff
// - Credentials are verified and the zone's base domain resolved once, in
//   `CloudflareClient::connect`. Failures there are fatal to the caller.
// - Updates are `PATCH` requests carrying only the changed fields
// - Dry-run mode performs every read and logs the writes it would make
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or `Debug` output
// - Header values carrying credentials are marked sensitive
//
// ## API Reference
//
// - Verify token: GET `/user/tokens/verify` (key+email: GET `/user`)
// - Zone details: GET `/zones/:zone_id`
// - List records: GET `/zones/:zone_id/dns_records?type=A&per_page=100&page=1`
// - Create record: POST `/zones/:zone_id/dns_records`
// - Update record: PATCH `/zones/:zone_id/dns_records/:record_id`

mod wire;

use async_trait::async_trait;
use cfddns_core::traits::{DnsProvider, DnsProviderFactory};
use cfddns_core::{Auth, Error, NewRecord, RecordPatch, RecordType, RemoteRecord, Result, ZoneConfig};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use wire::{Envelope, TokenStatus, Zone};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Environment variable overriding the API base URL
pub const API_BASE_ENV: &str = "CFDDNS_API_BASE";

/// Environment variable selecting the run mode (`dry-run` or live)
pub const MODE_ENV: &str = "CFDDNS_MODE";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Records requested per list page (the API maximum)
const PER_PAGE: u32 = 100;

/// Id reported for records "created" in dry-run mode
const DRY_RUN_RECORD_ID: &str = "dry-run";

const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare API client bound to one zone
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform all GET requests (verification, zone, listings)
/// - Log the intended POST/PATCH payloads
/// - **NOT** modify any DNS record
pub struct CloudflareClient {
    /// API base URL without trailing slash
    api_base: String,

    /// Zone identifier from the configuration
    zone_id: String,

    /// Zone name, resolved at connect time
    base_domain: String,

    /// Credentials used for every request
    /// ⚠️ NEVER log this value
    auth: Auth,

    /// HTTP client with the auth headers installed
    client: reqwest::Client,

    /// Dry-run mode: if true, perform reads but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("api_base", &self.api_base)
            .field("zone_id", &self.zone_id)
            .field("base_domain", &self.base_domain)
            .field("auth", &self.auth)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareClient {
    /// Build a client and check it can be used for `zone_id`
    ///
    /// Verifies the credentials, then resolves the zone's base domain.
    ///
    /// # Errors
    ///
    /// - `Error::Authentication`: credentials rejected
    /// - `Error::NotFound`: unknown zone
    /// - `Error::Config`: credentials not representable as HTTP headers
    /// - transport and provider errors from the underlying requests
    pub async fn connect(
        api_base: &str,
        zone_id: &str,
        auth: Auth,
        dry_run: bool,
    ) -> Result<Self> {
        let mut client = Self::new(api_base, zone_id, auth, dry_run)?;

        if !client.verify_credentials().await? {
            return Err(Error::auth(match client.auth {
                Auth::BearerToken(_) => "API token validation failed",
                Auth::KeyEmail { .. } => "API key validation failed",
            }));
        }
        debug!("Credentials verified");

        client.base_domain = client.fetch_base_domain().await?;
        info!(
            "Connected to zone {} ({}){}",
            client.zone_id,
            client.base_domain,
            if client.dry_run { " [DRY-RUN]" } else { "" }
        );

        Ok(client)
    }

    /// Build a client without touching the network
    fn new(api_base: &str, zone_id: &str, auth: Auth, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .default_headers(auth_headers(&auth)?)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            zone_id: zone_id.to_string(),
            base_domain: String::new(),
            auth,
            client,
            dry_run,
        })
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn records_url(&self) -> String {
        self.url(&format!("/zones/{}/dns_records", self.zone_id))
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.records_url(), id)
    }

    /// Send a request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<Envelope<T>> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{}: failed to read response: {}", what, e)))?;

        if !status.is_success() {
            return Err(wire::status_error(status, what, &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| Error::invalid_response(format!("{}: {}", what, e)))?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{} rejected: {}", what, envelope.error_summary()),
            ));
        }

        Ok(envelope)
    }

    /// `GET /zones/{zone_id}` and return the zone name
    async fn fetch_base_domain(&self) -> Result<String> {
        let url = self.url(&format!("/zones/{}", self.zone_id));
        let zone: Zone = self
            .send(self.client.get(&url), "zone lookup")
            .await?
            .into_result("zone lookup")?;

        let name = zone.name.trim().trim_end_matches('.').to_lowercase();
        if name.is_empty() {
            return Err(Error::invalid_response("zone lookup: empty zone name"));
        }
        Ok(name)
    }

    /// `GET /zones/{zone_id}/dns_records/{id}`
    async fn fetch_record(&self, id: &str) -> Result<RemoteRecord> {
        self.send(self.client.get(self.record_url(id)), "record lookup")
            .await?
            .into_result("record lookup")
    }
}

#[async_trait]
impl DnsProvider for CloudflareClient {
    /// Check the credentials against the API
    ///
    /// Returns `Ok(false)` when the API rejects them; other failures (network,
    /// server errors) are propagated.
    async fn verify_credentials(&self) -> Result<bool> {
        let result = match self.auth {
            Auth::BearerToken(_) => self
                .send::<TokenStatus>(self.client.get(self.url("/user/tokens/verify")), "token verification")
                .await
                .and_then(|envelope| envelope.into_result("token verification"))
                .map(|token| token.status.is_empty() || token.status == "active"),
            Auth::KeyEmail { .. } => self
                .send::<serde_json::Value>(self.client.get(self.url("/user")), "key verification")
                .await
                .map(|_| true),
        };

        match result {
            Ok(valid) => Ok(valid),
            Err(e) if e.is_auth() => {
                warn!("Credential verification failed: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn base_domain(&self) -> &str {
        &self.base_domain
    }

    async fn list_records(&self, record_type: RecordType) -> Result<Vec<RemoteRecord>> {
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let request = self.client.get(self.records_url()).query(&[
                ("type", record_type.as_str().to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let envelope: Envelope<Vec<RemoteRecord>> = self.send(request, "record listing").await?;
            let info = envelope.result_info;
            let batch = envelope.into_result("record listing")?;
            let batch_len = batch.len();
            records.extend(batch);

            match info {
                Some(info) if info.has_more() && batch_len > 0 => page += 1,
                _ => break,
            }
        }

        debug!(
            "Listed {} {} record(s) in zone {}",
            records.len(),
            record_type,
            self.zone_id
        );
        Ok(records)
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RemoteRecord> {
        if self.dry_run {
            info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.records_url(),
                serde_json::to_string(record)?
            );
            return Ok(RemoteRecord {
                id: DRY_RUN_RECORD_ID.to_string(),
                name: record.name.clone(),
                content: record.content.clone(),
                proxied: record.proxied,
                ttl: record.ttl,
                record_type: record.record_type,
            });
        }

        let created: RemoteRecord = self
            .send(self.client.post(self.records_url()).json(record), "record creation")
            .await?
            .into_result("record creation")?;

        info!("DNS record created: {} -> {}", created.name, created.content);
        Ok(created)
    }

    async fn update_record(&self, id: &str, patch: &RecordPatch) -> Result<RemoteRecord> {
        if self.dry_run {
            let current = self.fetch_record(id).await?;
            info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                self.record_url(id),
                serde_json::to_string(patch)?
            );
            return Ok(patch.apply_to(&current));
        }

        let updated: RemoteRecord = self
            .send(self.client.patch(self.record_url(id)).json(patch), "record update")
            .await?
            .into_result("record update")?;

        info!("DNS record updated: {} -> {}", updated.name, updated.content);
        Ok(updated)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Default headers carrying the credentials
fn auth_headers(auth: &Auth) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    match auth {
        Auth::BearerToken(token) => {
            headers.insert(AUTHORIZATION, sensitive(&format!("Bearer {}", token))?);
        }
        Auth::KeyEmail { key, email } => {
            headers.insert(HeaderName::from_static("x-auth-email"), sensitive(email)?);
            headers.insert(HeaderName::from_static("x-auth-key"), sensitive(key)?);
        }
    }
    Ok(headers)
}

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| Error::config("Credentials contain characters not allowed in HTTP headers"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Factory for connected Cloudflare clients
#[derive(Debug, Clone)]
pub struct CloudflareFactory {
    api_base: String,
    dry_run: bool,
}

impl CloudflareFactory {
    /// Factory for the public API in live mode
    pub fn new() -> Self {
        Self {
            api_base: CLOUDFLARE_API_BASE.to_string(),
            dry_run: false,
        }
    }

    /// Factory honoring `CFDDNS_API_BASE` and `CFDDNS_MODE`
    pub fn from_env() -> Self {
        let mut factory = Self::new();

        let api_base = std::env::var(API_BASE_ENV).unwrap_or_default();
        if !api_base.trim().is_empty() {
            info!("Using Cloudflare API base {}", api_base.trim());
            factory = factory.with_api_base(api_base.trim());
        }

        let dry_run = std::env::var(MODE_ENV)
            .unwrap_or_default()
            .eq_ignore_ascii_case("dry-run");
        if dry_run {
            warn!("Cloudflare client running in DRY-RUN mode - no changes will be made");
        }

        factory.dry_run(dry_run)
    }

    /// Talk to `api_base` instead of the public API
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Enable or disable dry-run mode
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// API base URL clients will use
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl Default for CloudflareFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsProviderFactory for CloudflareFactory {
    async fn connect(&self, config: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
        let auth = config.credentials()?;
        let client = CloudflareClient::connect(&self.api_base, &config.zone_id, auth, self.dry_run).await?;
        Ok(Box::new(client))
    }
}
