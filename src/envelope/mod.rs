//! HTTP event envelope codec.
//!
//! # Data Flow
//! ```text
//! Edge (forward proxy):
//!     inbound Request<Body>
//!     → request.rs (RequestEnvelope::from_request)
//!     → JSON payload → invocation target
//!     → JSON payload → response.rs (ResponseEnvelope::into_response)
//!     → Response to caller
//!
//! Signing function:
//!     JSON payload → RequestEnvelope::into_request → sign → outbound call
//!     → ResponseEnvelope::from_response → JSON payload
//! ```
//!
//! # Design Decisions
//! - Multi-value maps are authoritative when non-empty; single-value maps
//!   are last-value-wins projections
//! - Bodies that are not valid UTF-8 travel as standard base64
//! - Header keys are emitted in canonical MIME form (`X-Forwarded-For`)
//! - Decoded requests always target `https://`

pub mod body;
pub mod request;
pub mod response;

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub use request::RequestEnvelope;
pub use response::ResponseEnvelope;

/// Errors raised while converting between envelopes and HTTP messages.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid http method {0:?}")]
    InvalidMethod(String),

    #[error("invalid request target {0:?}")]
    InvalidTarget(String),

    #[error("missing Host header")]
    MissingHost,

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("invalid envelope json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Single-value and multi-value projections of a header or query set.
pub(crate) type Projections = (BTreeMap<String, String>, BTreeMap<String, Vec<String>>);

/// Canonical MIME form of a header name: `x-forwarded-for` → `X-Forwarded-For`.
pub fn canonical_header_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Treat a JSON `null` as the type's default value.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn last_values(multi: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, String> {
    multi
        .iter()
        .filter_map(|(k, v)| v.last().map(|last| (k.clone(), last.clone())))
        .collect()
}

pub(crate) fn header_projections(headers: &HeaderMap) -> Projections {
    let mut multi: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        multi
            .entry(canonical_header_key(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    (last_values(&multi), multi)
}

/// Rebuild a `HeaderMap`, preferring the multi-value map when it is non-empty.
pub(crate) fn header_map(
    single: &BTreeMap<String, String>,
    multi: &BTreeMap<String, Vec<String>>,
) -> Result<HeaderMap, EnvelopeError> {
    let mut headers = HeaderMap::new();
    if !multi.is_empty() {
        for (name, values) in multi {
            let header_name = parse_header_name(name)?;
            for value in values {
                headers.append(header_name.clone(), parse_header_value(name, value)?);
            }
        }
    } else {
        for (name, value) in single {
            headers.insert(parse_header_name(name)?, parse_header_value(name, value)?);
        }
    }
    Ok(headers)
}

fn parse_header_name(name: &str) -> Result<HeaderName, EnvelopeError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| EnvelopeError::InvalidHeader {
        name: name.to_string(),
    })
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, EnvelopeError> {
    HeaderValue::from_str(value).map_err(|_| EnvelopeError::InvalidHeader {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("x-forwarded-for"), "X-Forwarded-For");
        assert_eq!(canonical_header_key("HOST"), "Host");
        assert_eq!(canonical_header_key("te"), "Te");
        assert_eq!(canonical_header_key("content-md5"), "Content-Md5");
    }

    #[test]
    fn test_header_map_prefers_multi_values() {
        let single = BTreeMap::from([("X-Only-Single".to_string(), "s".to_string())]);
        let multi = BTreeMap::from([(
            "Accept".to_string(),
            vec!["text/html".to_string(), "application/json".to_string()],
        )]);

        let headers = header_map(&single, &multi).unwrap();
        assert!(headers.get("x-only-single").is_none());
        let accept: Vec<_> = headers.get_all("accept").iter().collect();
        assert_eq!(accept, vec!["text/html", "application/json"]);
    }

    #[test]
    fn test_header_map_falls_back_to_single_values() {
        let single = BTreeMap::from([("X-Api-Key".to_string(), "k".to_string())]);
        let headers = header_map(&single, &BTreeMap::new()).unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "k");
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let single = BTreeMap::from([("bad header".to_string(), "v".to_string())]);
        let err = header_map(&single, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidHeader { .. }));
    }
}
