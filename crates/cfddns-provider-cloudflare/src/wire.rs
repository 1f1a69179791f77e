//! Cloudflare API v4 response envelope
//!
//! Every endpoint answers with the same wrapper:
//!
//! ```json
//! { "success": true, "errors": [], "messages": [], "result": ..., "result_info": {...} }
//! ```

use cfddns_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;

/// Response wrapper shared by all endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub errors: Vec<ApiMessage>,

    pub result: Option<T>,

    /// Present on paginated list endpoints
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    /// The `result` payload, or an error if the API left it out
    pub fn into_result(self, what: &str) -> Result<T> {
        self.result
            .ok_or_else(|| Error::invalid_response(format!("{}: response has no result", what)))
    }

    /// API error messages joined for logging
    pub fn error_summary(&self) -> String {
        summarize(&self.errors)
    }
}

/// One entry of the `errors` array
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Pagination block of list responses
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

impl ResultInfo {
    /// Whether pages after `page` remain
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// `GET /zones/{zone_id}` result
#[derive(Debug, Deserialize)]
pub(crate) struct Zone {
    pub name: String,
}

/// `GET /user/tokens/verify` result
#[derive(Debug, Deserialize)]
pub(crate) struct TokenStatus {
    #[serde(default)]
    pub status: String,
}

fn summarize(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Map a non-2xx response to an error kind
///
/// `body` is parsed as an envelope when possible so the API's own error
/// messages end up in the log instead of raw JSON.
pub(crate) fn status_error(status: StatusCode, what: &str, body: &str) -> Error {
    let details = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .map(|envelope| envelope.error_summary())
        .unwrap_or_else(|_| body.chars().take(200).collect());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid credentials or insufficient permissions ({}): {}",
            what, status, details
        )),
        404 => Error::not_found(format!("{}: {}", what, details)),
        429 => Error::rate_limited(format!("{}: {} - {}", what, status, details)),
        500..=599 => Error::provider(
            "cloudflare",
            format!("{}: server error (transient) {} - {}", what, status, details),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("{}: {} - {}", what, status, details),
        ),
    }
}
