//! Configuration types for the cfddns updater
//!
//! The configuration file is YAML (JSON documents parse too):
//!
//! ```yaml
//! auth:
//!   api_token: "..."
//! zone_id: "023e105f4ecef8ad9ca31a8372d0c353"
//! subdomains:
//!   home: { proxied: false, ttl: 300 }
//!   "@": { proxied: true, ttl: auto }
//! ```
//!
//! Hostnames keep the order they are declared in, which is the order a pass
//! reconciles them in.

use crate::error::{Error, Result};
use crate::fingerprint::ConfigFingerprint;
use crate::record::AUTO_TTL;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Smallest explicit TTL the provider accepts
pub const MIN_TTL: u32 = 60;

/// Largest explicit TTL the provider accepts
pub const MAX_TTL: u32 = 86_400;

/// TTL used when the configured one is out of range or malformed
pub const DEFAULT_TTL: u32 = 300;

/// Values shipped in the sample configuration that must be replaced
const PLACEHOLDERS: &[&str] = &[
    "your_api_token_here",
    "your_api_key_here",
    "your_email_here",
];

/// Zone configuration: credentials, zone and the hostnames to keep updated
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    /// Credentials block
    pub auth: AuthConfig,

    /// Provider zone identifier
    pub zone_id: String,

    /// Hostnames to manage, in declaration order
    #[serde(deserialize_with = "ordered_hostnames")]
    pub subdomains: Vec<HostnameSpec>,
}

impl ZoneConfig {
    /// Parse a configuration document without validating it
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse and validate a configuration document
    pub fn parse(text: &str) -> Result<Self> {
        let config = Self::from_yaml(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, fingerprint, parse and validate a configuration file.
    ///
    /// The fingerprint is computed over the same bytes that were parsed, so a
    /// write racing with the load is picked up on the next comparison.
    pub fn load(path: impl AsRef<Path>) -> Result<LoadedConfig> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::config(format!("Cannot read configuration file {}: {}", path.display(), e))
        })?;
        let fingerprint = ConfigFingerprint::of(&bytes);
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::config(format!("{} is not valid UTF-8", path.display())))?;

        Ok(LoadedConfig {
            config: Self::parse(&text)?,
            fingerprint,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.zone_id.trim().is_empty() {
            return Err(Error::config("zone_id cannot be empty"));
        }

        self.auth.resolve()?;

        if self.subdomains.is_empty() {
            return Err(Error::config("No subdomains configured"));
        }

        for spec in &self.subdomains {
            validate_hostname(&spec.name)?;
        }

        Ok(())
    }

    /// The credentials this configuration authenticates with
    pub fn credentials(&self) -> Result<Auth> {
        self.auth.resolve()
    }
}

/// A configuration together with the fingerprint of the bytes it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration
    pub config: ZoneConfig,
    /// Fingerprint of the file content
    pub fingerprint: ConfigFingerprint,
}

/// Raw `auth` block as written in the file
#[derive(Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Scoped API token
    #[serde(default)]
    pub api_token: Option<String>,

    /// Global API key with account email
    #[serde(default)]
    pub api_key: Option<ApiKeyConfig>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field("api_key", &self.api_key)
            .finish()
    }
}

impl AuthConfig {
    /// Pick the single usable credential form.
    ///
    /// Exactly one of the token or the key+email pair must be present and
    /// not a placeholder.
    pub fn resolve(&self) -> Result<Auth> {
        let token = self
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| is_usable(t));

        let key = self
            .api_key
            .as_ref()
            .filter(|k| is_usable(k.key.trim()) && is_usable(k.email.trim()));

        match (token, key) {
            (Some(token), None) => Ok(Auth::BearerToken(token.to_string())),
            (None, Some(key)) => Ok(Auth::KeyEmail {
                key: key.key.trim().to_string(),
                email: key.email.trim().to_string(),
            }),
            (Some(_), Some(_)) => Err(Error::config(
                "auth.api_token and auth.api_key are mutually exclusive; configure only one",
            )),
            (None, None) => Err(Error::config(
                "auth requires a usable api_token or an api_key with key and email",
            )),
        }
    }
}

/// Global API key credentials
#[derive(Clone, Deserialize)]
pub struct ApiKeyConfig {
    /// Global API key
    pub key: String,
    /// Account email
    pub email: String,
}

impl fmt::Debug for ApiKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyConfig")
            .field("key", &"<REDACTED>")
            .field("email", &self.email)
            .finish()
    }
}

/// Resolved credentials
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <token>`
    BearerToken(String),
    /// `X-Auth-Key` + `X-Auth-Email`
    KeyEmail {
        /// Global API key
        key: String,
        /// Account email
        email: String,
    },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::BearerToken(_) => f.write_str("BearerToken(<REDACTED>)"),
            Auth::KeyEmail { email, .. } => f
                .debug_struct("KeyEmail")
                .field("key", &"<REDACTED>")
                .field("email", email)
                .finish(),
        }
    }
}

/// Desired state of one hostname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameSpec {
    /// Label, fully-qualified name, or `@` for the zone apex
    pub name: String,
    /// Whether the record should be proxied
    pub proxied: bool,
    /// TTL as written in the file
    pub ttl: TtlSetting,
}

impl HostnameSpec {
    /// Create a hostname spec
    pub fn new(name: impl Into<String>, proxied: bool, ttl: TtlSetting) -> Self {
        Self {
            name: name.into(),
            proxied,
            ttl,
        }
    }

    /// TTL to send to the provider, after normalization
    pub fn effective_ttl(&self) -> u32 {
        let ttl = self.ttl.normalize();
        if ttl == DEFAULT_TTL && !self.ttl.is_valid() {
            warn!(
                "Invalid TTL value for {}: '{}'. Defaulting to {}.",
                self.name, self.ttl, DEFAULT_TTL
            );
        }
        ttl
    }
}

/// TTL as written in the configuration: a number or a string such as `auto`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TtlSetting {
    /// Numeric TTL
    Seconds(i64),
    /// Textual TTL (`auto`, or a number in quotes)
    Text(String),
    /// Anything else (`null`, fractions, lists); always normalizes to 300
    Other(serde_yaml::Value),
}

impl TtlSetting {
    /// Provider-managed TTL
    pub fn auto() -> Self {
        TtlSetting::Text("auto".to_string())
    }

    fn as_number(&self) -> Option<i64> {
        match self {
            TtlSetting::Seconds(secs) => Some(*secs),
            TtlSetting::Text(text) => text.trim().parse().ok(),
            TtlSetting::Other(_) => None,
        }
    }

    fn is_auto(&self) -> bool {
        let keyword = match self {
            TtlSetting::Text(text) => text.trim().eq_ignore_ascii_case("auto"),
            TtlSetting::Seconds(_) | TtlSetting::Other(_) => false,
        };
        keyword || self.as_number() == Some(i64::from(AUTO_TTL))
    }

    /// Whether the setting is usable as written
    pub fn is_valid(&self) -> bool {
        self.is_auto()
            || self
                .as_number()
                .is_some_and(|n| (i64::from(MIN_TTL)..=i64::from(MAX_TTL)).contains(&n))
    }

    /// `auto`/1 become 1, in-range values pass through, anything else is 300
    pub fn normalize(&self) -> u32 {
        if self.is_auto() {
            return AUTO_TTL;
        }
        match self.as_number() {
            Some(n) if (i64::from(MIN_TTL)..=i64::from(MAX_TTL)).contains(&n) => n as u32,
            _ => DEFAULT_TTL,
        }
    }
}

impl fmt::Display for TtlSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlSetting::Seconds(secs) => write!(f, "{}", secs),
            TtlSetting::Text(text) => f.write_str(text),
            TtlSetting::Other(value) => {
                let rendered = serde_yaml::to_string(value).unwrap_or_default();
                f.write_str(rendered.trim_end())
            }
        }
    }
}

#[derive(Deserialize)]
struct HostnameSettings {
    proxied: bool,
    ttl: TtlSetting,
}

fn ordered_hostnames<'de, D>(deserializer: D) -> std::result::Result<Vec<HostnameSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    struct HostnamesVisitor;

    impl<'de> Visitor<'de> for HostnamesVisitor {
        type Value = Vec<HostnameSpec>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of hostname to { proxied, ttl }")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut hostnames = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, settings)) = map.next_entry::<String, HostnameSettings>()? {
                hostnames.push(HostnameSpec::new(name, settings.proxied, settings.ttl));
            }
            Ok(hostnames)
        }
    }

    deserializer.deserialize_map(HostnamesVisitor)
}

fn is_usable(value: &str) -> bool {
    !value.is_empty() && !PLACEHOLDERS.contains(&value)
}

fn validate_hostname(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::config("Hostname cannot be empty"));
    }
    if name == "@" {
        return Ok(());
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return Err(Error::config(format!(
            "Found invalid characters in hostname: {}",
            name
        )));
    }
    if name.len() > 253 {
        return Err(Error::config(format!("Hostname too long: {}", name)));
    }
    Ok(())
}
