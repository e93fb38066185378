//! Parameter Source: a hierarchical key-value store listed by path prefix.

use std::collections::BTreeMap;
use std::ops::Bound;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest page the in-memory store hands out, matching common hosted stores.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A stored parameter as listed by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredParameter {
    /// Full hierarchical name, e.g. `/prod/api.example.com/headers/x-api-key`.
    pub name: String,
    pub value: String,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPage {
    pub parameters: Vec<StoredParameter>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

/// A listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    pub path: String,
    pub recursive: bool,
    pub with_decryption: bool,
    pub next_token: Option<String>,
}

/// Errors reported by a parameter source.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("parameter store unavailable: {0}")]
    Unavailable(String),

    #[error("access to {path} denied")]
    AccessDenied { path: String },

    #[error("invalid pagination token {0:?}")]
    InvalidToken(String),

    #[error("parameter store client unavailable: {0}")]
    Client(String),
}

#[async_trait]
pub trait ParameterSource: Send + Sync {
    /// List parameters under `query.path`, one page at a time.
    async fn get_parameters_by_path(&self, query: PathQuery) -> Result<ParameterPage, StoreError>;
}

/// In-process parameter source backed by an atomically swapped snapshot.
///
/// Values are held in clear text, so `with_decryption` has no effect.
pub struct MemoryParameterStore {
    entries: ArcSwap<BTreeMap<String, String>>,
    page_size: usize,
}

impl MemoryParameterStore {
    pub fn new(page_size: usize) -> Self {
        Self::from_entries(BTreeMap::new(), page_size)
    }

    pub fn from_entries(entries: BTreeMap<String, String>, page_size: usize) -> Self {
        Self {
            entries: ArcSwap::from_pointee(entries),
            page_size: page_size.max(1),
        }
    }

    /// Replace the whole snapshot, e.g. after the parameters file changed.
    pub fn replace(&self, entries: BTreeMap<String, String>) {
        let count = entries.len();
        self.entries.store(entries.into());
        tracing::info!(entries = count, "Parameter store snapshot replaced");
    }

    /// Insert or overwrite a single parameter.
    pub fn put(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.entries.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.insert(name.clone(), value.clone());
            next
        });
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryParameterStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[async_trait]
impl ParameterSource for MemoryParameterStore {
    async fn get_parameters_by_path(&self, query: PathQuery) -> Result<ParameterPage, StoreError> {
        let snapshot = self.entries.load();
        let prefix = format!("{}/", query.path.trim_end_matches('/'));

        let start = match query.next_token {
            Some(token) if !token.starts_with(&prefix) => return Err(StoreError::InvalidToken(token)),
            Some(token) => Bound::Excluded(token),
            None => Bound::Included(prefix.clone()),
        };

        let mut matching = snapshot
            .range::<String, _>((start, Bound::Unbounded))
            .take_while(|(name, _)| name.starts_with(&prefix))
            .filter(|(name, _)| query.recursive || !name[prefix.len()..].contains('/'));

        let parameters: Vec<StoredParameter> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(name, value)| StoredParameter {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        let next_token = if matching.next().is_some() {
            parameters.last().map(|p| p.name.clone())
        } else {
            None
        };

        Ok(ParameterPage {
            parameters,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(page_size: usize) -> MemoryParameterStore {
        MemoryParameterStore::from_entries(
            BTreeMap::from([
                ("/dev/a.example.com/headers/x-key".to_string(), "k".to_string()),
                ("/dev/a.example.com/basic/username".to_string(), "u".to_string()),
                ("/dev/a.example.com/basic/password".to_string(), "p".to_string()),
                ("/dev/a.example.com.evil/headers/x-key".to_string(), "evil".to_string()),
                ("/dev/b.example.com/headers/x-key".to_string(), "b".to_string()),
                ("/dev/a.example.com-top".to_string(), "top".to_string()),
            ]),
            page_size,
        )
    }

    fn query(path: &str, recursive: bool, next_token: Option<String>) -> PathQuery {
        PathQuery {
            path: path.to_string(),
            recursive,
            with_decryption: true,
            next_token,
        }
    }

    #[tokio::test]
    async fn test_lists_only_entries_under_path() {
        let page = store(10)
            .get_parameters_by_path(query("/dev/a.example.com", true, None))
            .await
            .unwrap();
        let names: Vec<_> = page.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "/dev/a.example.com/basic/password",
                "/dev/a.example.com/basic/username",
                "/dev/a.example.com/headers/x-key",
            ]
        );
        assert_eq!(page.next_token, None);
    }

    #[tokio::test]
    async fn test_non_recursive_listing_skips_nested() {
        let store = store(10);
        store.put("/dev/a.example.com/direct", "d");
        let page = store
            .get_parameters_by_path(query("/dev/a.example.com", false, None))
            .await
            .unwrap();
        assert_eq!(page.parameters.len(), 1);
        assert_eq!(page.parameters[0].value, "d");
    }

    #[tokio::test]
    async fn test_pagination() {
        let store = store(2);
        let first = store
            .get_parameters_by_path(query("/dev/a.example.com/", true, None))
            .await
            .unwrap();
        assert_eq!(first.parameters.len(), 2);
        let token = first.next_token.clone().unwrap();

        let second = store
            .get_parameters_by_path(query("/dev/a.example.com/", true, Some(token)))
            .await
            .unwrap();
        assert_eq!(second.parameters.len(), 1);
        assert_eq!(second.parameters[0].name, "/dev/a.example.com/headers/x-key");
        assert_eq!(second.next_token, None);
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let err = store(2)
            .get_parameters_by_path(query("/dev/a.example.com", true, Some("/other".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidToken(_)));
    }

    #[test]
    fn test_replace_swaps_snapshot() {
        let store = store(10);
        assert_eq!(store.len(), 6);
        store.replace(BTreeMap::new());
        assert!(store.is_empty());
    }
}
