//! In-process SWR cache (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Entries are indexed by serialized key and remember the raw key they were
//! written under, so batch operations can decode it later.

use super::{SwrCache, Update};
use crate::error::Result;
use crate::key::RawKey;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Refetch function registered for a key.
pub type Fetcher = Arc<dyn Fn(RawKey) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

struct CacheEntry {
    key: RawKey,
    data: Option<Value>,
}

/// Thread-safe async in-process SWR cache.
///
/// Revalidating a key runs the fetcher registered for it (if any) and stores
/// the result. A failing fetcher is logged and leaves the data untouched.
///
/// # Example
///
/// ```no_run
/// use mutation_kit::backend::{InMemorySwrCache, SwrCache, Update};
/// use mutation_kit::{RawKey, StructuredKey};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = InMemorySwrCache::new();
///     let key = RawKey::from(StructuredKey::new("todos", json!("/api/todos")));
///
///     cache.register(key.clone(), |_| async { Ok(json!([{ "id": 1 }])) });
///
///     // Refetch from source
///     cache.mutate(&key, Update::Keep, true).await?;
///     assert_eq!(cache.get(&key).await?, Some(json!([{ "id": 1 }])));
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemorySwrCache {
    store: Arc<DashMap<String, CacheEntry>>,
    fetchers: Arc<DashMap<String, Fetcher>>,
    revalidations: Arc<DashMap<String, usize>>,
}

impl InMemorySwrCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        InMemorySwrCache {
            store: Arc::new(DashMap::new()),
            fetchers: Arc::new(DashMap::new()),
            revalidations: Arc::new(DashMap::new()),
        }
    }

    /// Seed data for a key.
    pub fn insert(&self, key: impl Into<RawKey>, value: Value) {
        let key = key.into();
        self.store.insert(
            key.serialize(),
            CacheEntry {
                key,
                data: Some(value),
            },
        );
    }

    /// Register the fetcher used when `key` is revalidated.
    ///
    /// Also makes the key known to the cache with no data yet, the way a
    /// subscribed reader would.
    pub fn register<F, Fut>(&self, key: impl Into<RawKey>, fetcher: F)
    where
        F: Fn(RawKey) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let key = key.into();
        let serialized = key.serialize();
        let fetcher: Fetcher = Arc::new(move |key| fetcher(key).boxed());

        self.fetchers.insert(serialized.clone(), fetcher);
        self.store
            .entry(serialized.clone())
            .or_insert_with(|| CacheEntry { key, data: None });
        debug!("✓ SWR REGISTER {}", serialized);
    }

    /// How many times `key` was revalidated.
    pub fn revalidation_count(&self, key: &RawKey) -> usize {
        self.revalidations
            .get(&key.serialize())
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Revalidations across all keys.
    pub fn total_revalidations(&self) -> usize {
        self.revalidations.iter().map(|count| *count.value()).sum()
    }

    /// Number of known keys, with or without data.
    pub async fn len(&self) -> usize {
        self.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop every entry and fetcher.
    pub async fn clear_all(&self) {
        self.store.clear();
        self.fetchers.clear();
        warn!("⚠ SWR CLEAR_ALL executed - all cache cleared!");
    }

    async fn revalidate(&self, key: &RawKey, serialized: &str) {
        *self
            .revalidations
            .entry(serialized.to_string())
            .or_insert(0) += 1;

        let fetcher = self
            .fetchers
            .get(serialized)
            .map(|fetcher| Arc::clone(fetcher.value()));
        let Some(fetcher) = fetcher else {
            debug!("SWR REVALIDATE {} -> no fetcher registered", serialized);
            return;
        };

        match fetcher(key.clone()).await {
            Ok(value) => {
                self.store.insert(
                    serialized.to_string(),
                    CacheEntry {
                        key: key.clone(),
                        data: Some(value),
                    },
                );
                debug!("✓ SWR REVALIDATE {} -> refreshed", serialized);
            }
            Err(e) => warn!("⚠ SWR REVALIDATE {} failed: {}", serialized, e),
        }
    }
}

impl Default for InMemorySwrCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SwrCache for InMemorySwrCache {
    async fn get(&self, key: &RawKey) -> Result<Option<Value>> {
        let serialized = key.serialize();
        let data = self
            .store
            .get(&serialized)
            .and_then(|entry| entry.data.clone());

        debug!(
            "✓ SWR GET {} -> {}",
            serialized,
            if data.is_some() { "HIT" } else { "MISS" }
        );
        Ok(data)
    }

    async fn mutate(
        &self,
        key: &RawKey,
        update: Update,
        revalidate: bool,
    ) -> Result<Option<Value>> {
        let serialized = key.serialize();

        match update {
            Update::Keep => {}
            Update::Set(value) => {
                self.store.insert(
                    serialized.clone(),
                    CacheEntry {
                        key: key.clone(),
                        data: Some(value),
                    },
                );
                debug!("✓ SWR SET {}", serialized);
            }
            Update::Clear => {
                if let Some(mut entry) = self.store.get_mut(&serialized) {
                    entry.data = None;
                }
                debug!("✓ SWR CLEAR {}", serialized);
            }
        }

        if revalidate {
            self.revalidate(key, &serialized).await;
        }

        Ok(self
            .store
            .get(&serialized)
            .and_then(|entry| entry.data.clone()))
    }

    async fn keys(&self) -> Result<Vec<RawKey>> {
        Ok(self.store.iter().map(|entry| entry.key.clone()).collect())
    }
}
