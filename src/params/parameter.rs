//! Signing parameter model.
//!
//! A host's parameters live in the store as a flat list of entries named
//! `<category>/<name>`. Each entry is parsed into a [`ParameterEntry`] and
//! folded into an immutable [`SigningParameter`].

use std::collections::BTreeMap;

use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Category token of a store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// `headers/<name>`: header overwrite.
    Headers,
    /// `basic/username`, `basic/password`: basic-auth credentials.
    Basic,
    /// `rewrite/path`: request path override.
    Rewrite,
    /// `queries/<name>`: query parameter overwrite.
    Queries,
}

impl Category {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "headers" => Some(Self::Headers),
            "basic" => Some(Self::Basic),
            "rewrite" => Some(Self::Rewrite),
            "queries" => Some(Self::Queries),
            _ => None,
        }
    }
}

/// A single recognised store entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterEntry {
    Header { name: HeaderName, value: HeaderValue },
    Username(String),
    Password(String),
    RewritePath(String),
    Query { name: String, value: String },
}

impl ParameterEntry {
    /// Parse an entry name relative to the host's prefix, e.g. `headers/x-api-key`.
    ///
    /// Returns `None` for entries that carry no signing meaning: unknown
    /// categories, names without a category separator, and values that cannot
    /// be placed on an HTTP request.
    pub fn parse(relative_name: &str, value: &str) -> Option<Self> {
        let name = relative_name.trim_end_matches('/');
        let (category, name) = name.split_once('/')?;

        match Category::parse(category)? {
            Category::Headers => {
                let (Ok(header_name), Ok(header_value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) else {
                    tracing::warn!(entry = %relative_name, "Ignoring header parameter that is not a valid HTTP header");
                    return None;
                };
                Some(Self::Header {
                    name: header_name,
                    value: header_value,
                })
            }
            Category::Basic => match name {
                "username" => Some(Self::Username(value.to_string())),
                "password" => Some(Self::Password(value.to_string())),
                _ => None,
            },
            Category::Rewrite => match name {
                "path" => {
                    let path = absolute_path(value);
                    if PathAndQuery::try_from(path.as_str()).is_err() {
                        tracing::warn!(entry = %relative_name, "Ignoring rewrite path that is not a valid URI path");
                        return None;
                    }
                    Some(Self::RewritePath(value.to_string()))
                }
                _ => None,
            },
            Category::Queries => Some(Self::Query {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Prefix a path with `/` when it lacks one.
pub(crate) fn absolute_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Per-host signing bundle. Immutable once assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningParameter {
    headers: HeaderMap,
    user: Option<String>,
    password: Option<String>,
    rewrite_path: Option<String>,
    queries: BTreeMap<String, String>,
}

impl SigningParameter {
    /// Assemble a parameter from store entries. Later entries overwrite earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = ParameterEntry>) -> Self {
        let mut parameter = Self::default();
        for entry in entries {
            match entry {
                ParameterEntry::Header { name, value } => {
                    parameter.headers.insert(name, value);
                }
                ParameterEntry::Username(user) => parameter.user = Some(user),
                ParameterEntry::Password(password) => parameter.password = Some(password),
                ParameterEntry::RewritePath(path) => parameter.rewrite_path = Some(path),
                ParameterEntry::Query { name, value } => {
                    parameter.queries.insert(name, value);
                }
            }
        }
        parameter
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Basic-auth user, if one is configured and non-empty.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref().filter(|u| !u.is_empty())
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn rewrite_path(&self) -> Option<&str> {
        self.rewrite_path.as_deref().filter(|p| !p.is_empty())
    }

    pub fn queries(&self) -> &BTreeMap<String, String> {
        &self.queries
    }
}
