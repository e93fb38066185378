//! Applies signing parameters to an outbound request.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::header::AUTHORIZATION;
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderValue, Request, Uri};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use url::form_urlencoded;

use crate::envelope::request::query_projections;
use crate::params::parameter::{absolute_path, SigningParameter};

#[derive(Debug, Error)]
pub enum SignError {
    #[error("signed request target {0:?} is not a valid URI")]
    InvalidTarget(String),

    #[error("basic credentials cannot be encoded as a header value")]
    InvalidCredentials,
}

impl SigningParameter {
    /// Produce the signed form of `request`.
    ///
    /// Applied in order: header overwrites, basic credentials, query merge
    /// (configured keys win, others are kept), path rewrite. The rewrite path
    /// is used verbatim, including any percent-encoding it carries.
    pub fn sign(&self, request: Request<Bytes>) -> Result<Request<Bytes>, SignError> {
        let (mut parts, body) = request.into_parts();

        for (name, value) in self.headers() {
            parts.headers.insert(name.clone(), value.clone());
        }

        if let Some(user) = self.user() {
            let authorization = basic_authorization(user, self.password().unwrap_or_default())?;
            parts.headers.insert(AUTHORIZATION, authorization);
        }

        let query = merge_query(parts.uri.query(), self.queries());
        let path = match self.rewrite_path() {
            Some(path) => absolute_path(path),
            None => parts.uri.path().to_string(),
        };
        parts.uri = with_target(&parts.uri, &path, query.as_deref())?;

        Ok(Request::from_parts(parts, body))
    }
}

fn basic_authorization(user: &str, password: &str) -> Result<HeaderValue, SignError> {
    let credentials = STANDARD.encode(format!("{user}:{password}"));
    HeaderValue::try_from(format!("Basic {credentials}")).map_err(|_| SignError::InvalidCredentials)
}

fn merge_query(existing: Option<&str>, overrides: &BTreeMap<String, String>) -> Option<String> {
    if overrides.is_empty() {
        return existing.map(str::to_owned);
    }

    let (_, mut values) = query_projections(existing);
    for (key, value) in overrides {
        values.insert(key.clone(), vec![value.clone()]);
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, vals) in &values {
        for value in vals {
            serializer.append_pair(key, value);
        }
    }
    Some(serializer.finish())
}

fn with_target(uri: &Uri, path: &str, query: Option<&str>) -> Result<Uri, SignError> {
    let mut target = path.to_string();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    let path_and_query = PathAndQuery::try_from(target.as_str())
        .map_err(|_| SignError::InvalidTarget(target.clone()))?;
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).map_err(|_| SignError::InvalidTarget(target))
}
