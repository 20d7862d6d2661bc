use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::MabotConfig;
use crate::error::MabotError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";

pub const MIME_JSON: &str = "application/json";
pub const MIME_FORM: &str = "application/x-www-form-urlencoded";

/// Build a deterministic header map for one gateway request.
///
/// `Authorization` is attached only when an access token is present.
pub fn build_headers(
    config: &MabotConfig,
    access_token: Option<&str>,
    content_type: &str,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), MIME_JSON.to_owned());
    headers.insert(HEADER_CONTENT_TYPE.to_owned(), content_type.to_owned());

    if let Some(user_agent) = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        headers.insert(HEADER_USER_AGENT.to_owned(), user_agent.to_owned());
    }

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    if let Some(token) = access_token.map(str::trim).filter(|token| !token.is_empty()) {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {token}"));
    }

    headers
}

pub(crate) fn to_header_map(headers: BTreeMap<String, String>) -> Result<HeaderMap, MabotError> {
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| MabotError::InvalidHeader(format!("invalid header key: {key}")))?,
            HeaderValue::from_str(&value)
                .map_err(|_| MabotError::InvalidHeader(format!("invalid header value for {key}")))?,
        );
    }
    Ok(out)
}

/// Whether a `Content-Type` header value denotes JSON.
pub fn is_json_content_type(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.to_ascii_lowercase().contains(MIME_JSON))
}
