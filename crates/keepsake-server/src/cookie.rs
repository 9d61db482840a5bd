//! Binding between session identifiers and HTTP cookies.

use std::time::Duration;

use axum::http::header::{COOKIE, InvalidHeaderValue};
use axum::http::{HeaderMap, HeaderValue};

/// Find the value of cookie `name` in the request headers.
///
/// Empty values are treated as absent. Values are percent-decoded.
pub fn extract_session_id(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().trim_matches('"'))
        })
        .find(|value| !value.is_empty())
        .and_then(|value| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

/// `Set-Cookie` value issuing `session_id`.
pub fn session_cookie(
    name: &str,
    session_id: &str,
    max_age: Duration,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; Max-Age={}",
        name,
        urlencoding::encode(session_id),
        max_age.as_secs()
    ))
}

/// `Set-Cookie` value telling the client to drop cookie `name`.
pub fn expired_cookie(name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; Path=/; HttpOnly; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        name
    ))
}
