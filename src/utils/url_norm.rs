//! Target URL validation and normalization.

use crate::error::AppError;
use serde_json::json;
use url::Url;

/// Parses and normalizes a target URL.
///
/// Accepts only absolute `http`/`https` URLs with a host. Parsing lowercases
/// the scheme and host and drops default ports, so equivalent spellings map
/// to one canonical form before the duplicate check.
///
/// # Errors
///
/// Returns [`AppError::Validation`] for relative URLs, unsupported schemes,
/// or URLs without a host.
pub fn normalize_url(raw: &str) -> Result<String, AppError> {
    let parsed = Url::parse(raw).map_err(|e| {
        AppError::bad_request("Invalid URL", json!({ "reason": e.to_string() }))
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::bad_request(
            "URL scheme must be http or https",
            json!({ "scheme": parsed.scheme() }),
        ));
    }

    if parsed.host_str().is_none() {
        return Err(AppError::bad_request(
            "URL must have a host",
            json!({ "url": raw }),
        ));
    }

    Ok(parsed.to_string())
}
