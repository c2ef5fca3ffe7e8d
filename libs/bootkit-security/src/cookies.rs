//! Minimal `Cookie` / `Set-Cookie` handling.

use axum::http::{HeaderMap, HeaderValue, header};

/// Value of the named request cookie.
#[must_use]
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"').to_owned())
}

/// `Set-Cookie` value with `Path=/` and `HttpOnly`.
#[must_use]
pub fn set(name: &str, value: &str, max_age: Option<u64>) -> Option<HeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly");
    if let Some(age) = max_age {
        cookie.push_str("; Max-Age=");
        cookie.push_str(&age.to_string());
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that expires the named cookie immediately.
#[must_use]
pub fn clear(name: &str) -> Option<HeaderValue> {
    set(name, "", Some(0))
}

/// Append a `Set-Cookie` header when `value` is valid.
pub fn append(headers: &mut HeaderMap, value: Option<HeaderValue>) {
    if let Some(v) = value {
        headers.append(header::SET_COOKIE, v);
    }
}
