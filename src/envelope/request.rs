//! Request envelope: the JSON event carried to the signing function.

use std::collections::BTreeMap;

use axum::body::{Body, Bytes};
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::uri::Scheme;
use axum::http::{Method, Request, Uri};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::envelope::{
    body, header_map, header_projections, last_values, nullable, EnvelopeError, Projections,
};

/// An HTTP request in event form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    #[serde(default)]
    pub http_method: String,

    /// Literal request path, never percent-decoded.
    #[serde(default)]
    pub path: String,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub query_string_parameters: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub multi_value_query_string_parameters: BTreeMap<String, Vec<String>>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub is_base64_encoded: bool,

    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
}

impl RequestEnvelope {
    /// Read the whole request body (up to `limit` bytes) and encode the request.
    pub async fn from_request(request: Request<Body>, limit: usize) -> Result<Self, EnvelopeError> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| EnvelopeError::Body(e.to_string()))?;
        Ok(Self::from_parts(&parts, &bytes))
    }

    /// Encode request head and an already-buffered body.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Self {
        let (query_string_parameters, multi_value_query_string_parameters) =
            query_projections(parts.uri.query());
        let (mut headers, mut multi_value_headers) = header_projections(&parts.headers);

        // HTTP/2 and absolute-form requests may carry the host only in the URI.
        if !parts.headers.contains_key(HOST) {
            if let Some(authority) = parts.uri.authority() {
                headers.insert("Host".to_string(), authority.to_string());
                multi_value_headers.insert("Host".to_string(), vec![authority.to_string()]);
            }
        }

        let (body, is_base64_encoded) = body::encode(body);

        Self {
            http_method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query_string_parameters,
            multi_value_query_string_parameters,
            headers,
            multi_value_headers,
            is_base64_encoded,
            body,
        }
    }

    /// Rebuild the outbound request described by this envelope.
    pub fn into_request(self) -> Result<Request<Bytes>, EnvelopeError> {
        let method = if self.http_method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(self.http_method.as_bytes())
                .map_err(|_| EnvelopeError::InvalidMethod(self.http_method.clone()))?
        };

        let headers = header_map(&self.headers, &self.multi_value_headers)?;
        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty())
            .ok_or(EnvelopeError::MissingHost)?;

        let query = encode_query(
            &self.query_string_parameters,
            &self.multi_value_query_string_parameters,
        );
        let uri = https_uri(host, &self.path, &query)?;
        let body = body::decode(self.body, self.is_base64_encoded)?;

        let mut request = Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }
}

/// Build an `https` URI from a host, a literal path and an encoded query.
pub(crate) fn https_uri(authority: &str, path: &str, query: &str) -> Result<Uri, EnvelopeError> {
    let mut target = String::with_capacity(path.len() + query.len() + 2);
    if !path.starts_with('/') {
        target.push('/');
    }
    target.push_str(path);
    if !query.is_empty() {
        target.push('?');
        target.push_str(query);
    }

    Uri::builder()
        .scheme(Scheme::HTTPS)
        .authority(authority)
        .path_and_query(target.as_str())
        .build()
        .map_err(|_| EnvelopeError::InvalidTarget(format!("https://{authority}{target}")))
}

pub(crate) fn query_projections(query: Option<&str>) -> Projections {
    let mut multi: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        multi.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    (last_values(&multi), multi)
}

fn encode_query(single: &BTreeMap<String, String>, multi: &BTreeMap<String, Vec<String>>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if !multi.is_empty() {
        for (key, values) in multi {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
    } else {
        for (key, value) in single {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}
