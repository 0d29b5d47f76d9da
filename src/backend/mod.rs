//! The stale-while-revalidate cache this crate layers mutations on.

use crate::error::Result;
use crate::key::RawKey;
use serde_json::Value;

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "inmemory")]
pub use inmemory::{Fetcher, InMemorySwrCache};

/// What a cache write does to an entry's data.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    /// Leave the data untouched. With `revalidate = true` this is a plain refetch.
    Keep,
    /// Replace the data.
    Set(Value),
    /// Make the data absent.
    Clear,
}

/// Capability over an SWR-style cache.
///
/// This crate never owns the cache: every component that needs one receives
/// it explicitly, which keeps the mutation logic testable against any
/// implementation.
///
/// **IMPORTANT:** All methods use `&self`. Implementations should use interior
/// mutability and be cheap to clone (share state through `Arc`).
///
/// **ASYNC:** All methods are async and must be awaited.
#[allow(async_fn_in_trait)]
pub trait SwrCache: Send + Sync + Clone {
    /// Read the current data for `key`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` - Data cached
    /// - `Ok(None)` - Nothing cached yet
    ///
    /// # Errors
    /// Returns `Err` if the cache cannot be read
    async fn get(&self, key: &RawKey) -> Result<Option<Value>>;

    /// Write `update` for `key`, then refetch from source when `revalidate` is set.
    ///
    /// Returns the data cached after the write (and refetch, if any).
    /// Refetch failures are the cache's own business and do not surface here.
    ///
    /// # Errors
    /// Returns `Err` if the write is rejected
    async fn mutate(&self, key: &RawKey, update: Update, revalidate: bool)
        -> Result<Option<Value>>;

    /// Every key the cache holds.
    ///
    /// # Errors
    /// Returns `Err` if the cache cannot be enumerated
    async fn keys(&self) -> Result<Vec<RawKey>>;

    /// Apply `update` to every entry whose key satisfies `predicate`.
    ///
    /// Internal keys (serialized form starting with `$`) are never offered to
    /// the predicate. Returns the keys that matched.
    ///
    /// Default implementation calls `mutate()` for each matching key.
    /// Override for batch efficiency.
    ///
    /// # Errors
    /// Returns `Err` on the first rejected write
    async fn mutate_matching<P>(
        &self,
        predicate: P,
        update: Update,
        revalidate: bool,
    ) -> Result<Vec<RawKey>>
    where
        P: Fn(&RawKey) -> bool + Send + Sync,
    {
        let matched: Vec<RawKey> = self
            .keys()
            .await?
            .into_iter()
            .filter(|key| !key.is_internal() && predicate(key))
            .collect();

        for key in &matched {
            self.mutate(key, update.clone(), revalidate).await?;
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::StructuredKey;
    use serde_json::json;

    #[tokio::test]
    async fn test_mutate_matching_default_skips_internal_keys() {
        let cache = InMemorySwrCache::new();
        cache.insert(StructuredKey::new("a", json!("/a")), json!(1));
        cache.insert("$inf$/feed", json!([]));
        cache.insert("/plain", json!(2));

        let matched = cache
            .mutate_matching(|_| true, Update::Clear, false)
            .await
            .expect("Failed to mutate");

        assert_eq!(matched.len(), 2);
        assert_eq!(
            cache
                .get(&RawKey::from("$inf$/feed"))
                .await
                .expect("Failed to get"),
            Some(json!([]))
        );
        assert_eq!(
            cache
                .get(&RawKey::from("/plain"))
                .await
                .expect("Failed to get"),
            None
        );
    }
}
