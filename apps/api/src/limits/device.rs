//! Device Identifier — sticky cookie, then a digest of the session id, then a
//! fresh token.

use axum::http::{header, HeaderMap};
use uuid::Uuid;

pub const DEVICE_COOKIE: &str = "jobcus_device";
pub const SESSION_COOKIE: &str = "session";

/// One year, in seconds.
const DEVICE_COOKIE_MAX_AGE: u32 = 31_536_000;
const MAX_TOKEN_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSource {
    Cookie,
    Session,
    Minted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub id: String,
    pub source: DeviceSource,
}

impl DeviceId {
    pub fn is_minted(&self) -> bool {
        self.source == DeviceSource::Minted
    }
}

/// Value of cookie `name`, scanning every `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k.trim() == name).then(|| v.trim())
        })
}

/// Tokens become part of a counter key, so only a conservative charset passes.
fn is_valid_token(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_TOKEN_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Stable device id for a session. The session id is a live credential and
/// must never reach a counter key, so only its v5 digest is used.
fn session_device_id(session_id: &str) -> String {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, session_id.as_bytes());
    format!("s-{}", digest.simple())
}

pub fn resolve_device(headers: &HeaderMap) -> DeviceId {
    if let Some(id) = cookie_value(headers, DEVICE_COOKIE).filter(|v| is_valid_token(v)) {
        return DeviceId {
            id: id.to_string(),
            source: DeviceSource::Cookie,
        };
    }
    if let Some(sid) = cookie_value(headers, SESSION_COOKIE).filter(|v| is_valid_token(v)) {
        return DeviceId {
            id: session_device_id(sid),
            source: DeviceSource::Session,
        };
    }
    DeviceId {
        id: Uuid::new_v4().simple().to_string(),
        source: DeviceSource::Minted,
    }
}

pub fn device_set_cookie(id: &str) -> String {
    format!(
        "{DEVICE_COOKIE}={id}; Path=/; Max-Age={DEVICE_COOKIE_MAX_AGE}; SameSite=Lax; HttpOnly"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        h
    }

    #[test]
    fn test_device_cookie_wins() {
        let device = resolve_device(&headers("session=abc; jobcus_device=dev-1"));
        assert_eq!(device.id, "dev-1");
        assert_eq!(device.source, DeviceSource::Cookie);
    }

    #[test]
    fn test_session_fallback() {
        let device = resolve_device(&headers("theme=dark; session=abc123"));
        assert_eq!(device.source, DeviceSource::Session);
        assert!(device.id.starts_with("s-"));
        assert_eq!(device.id.len(), 34);
        assert_eq!(
            device.id,
            resolve_device(&headers("session=abc123")).id,
            "same session maps to the same device"
        );
    }

    #[test]
    fn test_session_token_not_in_device_id() {
        let device = resolve_device(&headers("session=SECRET-session-token"));
        assert!(!device.id.contains("SECRET-session-token"));
        assert_ne!(device.id, resolve_device(&headers("session=other-token")).id);
    }

    #[test]
    fn test_minted_when_nothing_present() {
        let a = resolve_device(&HeaderMap::new());
        let b = resolve_device(&HeaderMap::new());
        assert!(a.is_minted());
        assert_eq!(a.id.len(), 32);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_malformed_cookie_is_ignored() {
        let device = resolve_device(&headers("jobcus_device=a:b:c"));
        assert!(device.is_minted());
    }

    #[test]
    fn test_set_cookie_header() {
        let value = device_set_cookie("abc");
        assert!(value.starts_with("jobcus_device=abc;"));
        assert!(value.contains("HttpOnly"));
    }
}
