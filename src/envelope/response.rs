//! Response envelope: the JSON event returned by the signing function.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::response::Parts;
use axum::http::{HeaderValue, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::envelope::{body, header_map, header_projections, nullable, EnvelopeError};

/// An HTTP response in event form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,

    /// Human-readable status line, e.g. `200 OK`.
    #[serde(default, deserialize_with = "nullable")]
    pub status_description: String,

    #[serde(default, deserialize_with = "nullable")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "nullable")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub body: String,

    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl ResponseEnvelope {
    /// Encode a fully buffered response.
    pub fn from_response(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self::from_parts(&parts, &body)
    }

    pub fn from_parts(parts: &Parts, body: &[u8]) -> Self {
        let (headers, multi_value_headers) = header_projections(&parts.headers);
        let (body, is_base64_encoded) = body::encode(body);

        Self {
            status_code: parts.status.as_u16(),
            status_description: status_line(parts.status),
            headers,
            multi_value_headers,
            body,
            is_base64_encoded,
        }
    }

    /// A plain-text response, as produced locally by the signing function.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            status_description: status_line(status),
            headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )]),
            multi_value_headers: BTreeMap::new(),
            body: body.into(),
            is_base64_encoded: false,
        }
    }

    /// Rebuild the HTTP response. `Content-Length` always reflects the decoded body.
    pub fn into_response(self) -> Result<Response<Bytes>, EnvelopeError> {
        let status =
            StatusCode::from_u16(self.status_code).map_err(|_| EnvelopeError::InvalidStatus(self.status_code))?;
        let mut headers = header_map(&self.headers, &self.multi_value_headers)?;
        let body = body::decode(self.body, self.is_base64_encoded)?;

        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// The `Content-Type` of the envelope, looked up case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.multi_value_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
            .and_then(|(_, v)| v.last())
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => status.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_response() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .body(Bytes::from_static(br#"{"key":"value"}"#))
            .unwrap();
        let envelope = ResponseEnvelope::from_response(response);

        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.status_description, "200 OK");
        assert_eq!(envelope.headers["Set-Cookie"], "b=2");
        assert_eq!(envelope.multi_value_headers["Set-Cookie"], vec!["a=1", "b=2"]);
        assert_eq!(envelope.body, r#"{"key":"value"}"#);
        assert_eq!(envelope.content_type(), Some("application/json"));
    }

    #[test]
    fn test_decode_single_value_payload() {
        let envelope: ResponseEnvelope = serde_json::from_str(
            r#"{"statusCode":200,"headers":{"Content-Type":"application/json"},"body":"{\"key\":\"value\"}"}"#,
        )
        .unwrap();
        let response = envelope.into_response().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()["content-length"], "15");
        assert_eq!(response.body().as_ref(), br#"{"key":"value"}"#);
    }

    #[test]
    fn test_decode_base64_body() {
        let envelope = ResponseEnvelope {
            status_code: 201,
            body: "AAEC/w==".into(),
            is_base64_encoded: true,
            ..Default::default()
        };
        let response = envelope.into_response().unwrap();
        assert_eq!(response.body().as_ref(), &[0x00, 0x01, 0x02, 0xff]);
        assert_eq!(response.headers()["content-length"], "4");
    }

    #[test]
    fn test_decode_invalid_status() {
        let envelope = ResponseEnvelope {
            status_code: 0,
            ..Default::default()
        };
        assert!(matches!(envelope.into_response(), Err(EnvelopeError::InvalidStatus(0))));
    }

    #[test]
    fn test_text_response() {
        let envelope = ResponseEnvelope::text(StatusCode::PROXY_AUTHENTICATION_REQUIRED, "nope\n");
        assert_eq!(envelope.status_code, 407);
        assert_eq!(envelope.status_description, "407 Proxy Authentication Required");
        assert_eq!(envelope.content_type(), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_wire_format() {
        let value = serde_json::to_value(ResponseEnvelope::text(StatusCode::OK, "ok")).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["statusDescription"], "200 OK");
        assert_eq!(value["headers"]["Content-Type"], "text/plain; charset=utf-8");
        assert!(value["multiValueHeaders"].as_object().unwrap().is_empty());
        assert_eq!(value["body"], "ok");
        assert_eq!(value["isBase64Encoded"], false);
    }
}
