//! Object-store backend (S3 and compatible stores).
//!
//! Object stores have no directories: a "directory" exists when at least one
//! key lives below it. Paths handed to this adapter are `bucket/key...`; the
//! store itself is bound to a single bucket.

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::FilesystemAdapter;
use crate::cache::ListingCache;
use crate::error::{Error, Result};
use crate::glob::{literal_prefix, GlobMatcher};

const BACKEND: &str = "object-store";

/// Options for a single glob call
#[derive(Debug, Clone, Copy)]
pub struct GlobOptions {
    /// Bypass and replace any cached listing for the pattern's prefix
    pub refresh: bool,
}

impl Default for GlobOptions {
    fn default() -> Self {
        GlobOptions { refresh: true }
    }
}

/// Adapter over an `object_store` client for one bucket
pub struct ObjectStoreFs {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    listings: ListingCache,
}

impl ObjectStoreFs {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        ObjectStoreFs {
            store,
            bucket: bucket.into(),
            listings: ListingCache::default(),
        }
    }

    /// Store-relative key for a `bucket/key` path.
    fn key<'a>(&self, path: &'a str) -> &'a str {
        let path = path.trim_start_matches('/');
        if path == self.bucket {
            return "";
        }
        path.strip_prefix(self.bucket.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(path)
    }

    fn external(&self, key: &str) -> String {
        if key.is_empty() {
            self.bucket.clone()
        } else {
            format!("{}/{}", self.bucket, key)
        }
    }

    /// All keys below `prefix`, from the cache unless `refresh` is set.
    async fn list_keys(&self, prefix: &str, refresh: bool) -> Result<Arc<Vec<String>>> {
        if refresh {
            self.listings.invalidate(prefix);
        } else if let Some(keys) = self.listings.get(prefix) {
            tracing::debug!(bucket = %self.bucket, prefix, "listing cache hit");
            return Ok(keys);
        }

        let location = ObjectPath::from(prefix);
        let listing = if prefix.is_empty() {
            self.store.list(None)
        } else {
            self.store.list(Some(&location))
        };
        let metas: Vec<_> = listing
            .try_collect()
            .await
            .map_err(|e| Error::transport(BACKEND, e))?;

        let keys: Arc<Vec<String>> = Arc::new(
            metas
                .into_iter()
                .map(|meta| meta.location.as_ref().to_string())
                .collect(),
        );
        tracing::debug!(bucket = %self.bucket, prefix, objects = keys.len(), "listed prefix");
        self.listings.put(prefix.to_string(), Arc::clone(&keys));
        Ok(keys)
    }

    /// Glob with explicit cache control.
    ///
    /// Every object key below the literal prefix and every directory level
    /// between the prefix and the key is a candidate.
    pub async fn glob_with(&self, pattern: &str, options: GlobOptions) -> Result<Vec<String>> {
        let key_pattern = self.key(pattern);
        let matcher = GlobMatcher::new(key_pattern)?;
        let prefix = literal_prefix(key_pattern);
        let prefix_depth = prefix.split('/').filter(|s| !s.is_empty()).count();

        let keys = self.list_keys(&prefix, options.refresh).await?;

        let mut matched = BTreeSet::new();
        for key in keys.iter() {
            let segments: Vec<&str> = key.split('/').collect();
            for depth in (prefix_depth + 1)..=segments.len() {
                let candidate = segments[..depth].join("/");
                if matcher.matches(&candidate) {
                    matched.insert(self.external(&candidate));
                }
            }
        }
        Ok(matched.into_iter().collect())
    }
}

#[async_trait]
impl FilesystemAdapter for ObjectStoreFs {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let key = self.key(path);
        if key.is_empty() {
            return Ok(true);
        }

        let location = ObjectPath::from(key);
        match self.store.head(&location).await {
            Ok(_) => return Ok(true),
            Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(Error::transport(BACKEND, e)),
        }

        // Directories only exist through the objects below them
        let mut below = self.store.list(Some(&location));
        let first = below
            .try_next()
            .await
            .map_err(|e| Error::transport(BACKEND, e))?;
        Ok(first.is_some())
    }

    /// Always refreshes: a stale listing would hide a version written moments ago.
    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        self.glob_with(pattern, GlobOptions { refresh: true }).await
    }
}
