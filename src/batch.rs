//! Batch invalidation across structured keys.
//!
//! These functions walk every key the cache holds, decode it with
//! [`decode`](crate::decode), and act on the entries whose `id` or `group` is
//! in the requested set. Keys that do not decode never match.
//!
//! | Call | Update | Default revalidate |
//! |------|--------|--------------------|
//! | `by_id(ids, Some(v))` / `by_group(groups, Some(v))` | data replaced by `v` | off |
//! | `by_id(ids, None)` / `by_group(groups, None)` | data kept | on (refetch) |
//! | `reset(preserved)` | data cleared | always off |

use crate::backend::{SwrCache, Update};
use crate::codec::decode;
use crate::key::{RawKey, StructuredKey};
use crate::mutation_error::{Cause, MutationError, MutationErrorContext};
use crate::operation::Operation;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Set of ids or groups to match.
///
/// Converts from a single string or a list of strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Targets(BTreeSet<String>);

impl Targets {
    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Targets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{}", joined.join(", "))
    }
}

impl From<&str> for Targets {
    fn from(value: &str) -> Self {
        Targets(BTreeSet::from([value.to_string()]))
    }
}

impl From<String> for Targets {
    fn from(value: String) -> Self {
        Targets(BTreeSet::from([value]))
    }
}

impl From<Vec<String>> for Targets {
    fn from(values: Vec<String>) -> Self {
        Targets(values.into_iter().collect())
    }
}

impl From<Vec<&str>> for Targets {
    fn from(values: Vec<&str>) -> Self {
        Targets(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Targets {
    fn from(values: &[&str]) -> Self {
        Targets(values.iter().map(|v| v.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(values: [&str; N]) -> Self {
        Targets(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Options for [`by_id`] and [`by_group`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Override the revalidation default.
    ///
    /// `None` means: refetch only when no new value is given.
    pub revalidate: Option<bool>,
}

impl BatchOptions {
    pub fn with_revalidate(mut self, revalidate: bool) -> Self {
        self.revalidate = Some(revalidate);
        self
    }
}

#[derive(Clone, Copy, Debug)]
enum Field {
    Id,
    Group,
}

impl Field {
    fn of(self, key: &StructuredKey) -> Option<&str> {
        match self {
            Field::Id => Some(key.id()),
            Field::Group => key.group(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Field::Id => "ids",
            Field::Group => "groups",
        }
    }
}

/// Update or revalidate every entry whose decoded `id` is in `ids`.
///
/// Returns the number of matched entries.
///
/// # Example
///
/// ```no_run
/// use mutation_kit::backend::InMemorySwrCache;
/// use mutation_kit::batch::{by_id, BatchOptions};
///
/// # async fn run(cache: InMemorySwrCache) -> Result<(), mutation_kit::MutationError> {
/// // Refetch both users
/// by_id(&cache, vec!["user-1", "user-2"], None, BatchOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns a [`MutationError`] (operation `update`, no key, `data` = `new_value`)
/// if the cache rejects the batch write.
pub async fn by_id<C: SwrCache>(
    cache: &C,
    ids: impl Into<Targets>,
    new_value: Option<Value>,
    options: BatchOptions,
) -> Result<usize, MutationError> {
    update_matching(cache, Field::Id, &ids.into(), new_value, options).await
}

/// Update or revalidate every entry whose decoded `group` is in `groups`.
///
/// Entries without a group never match. Returns the number of matched entries.
///
/// # Errors
///
/// Returns a [`MutationError`] (operation `update`, no key, `data` = `new_value`)
/// if the cache rejects the batch write.
pub async fn by_group<C: SwrCache>(
    cache: &C,
    groups: impl Into<Targets>,
    new_value: Option<Value>,
    options: BatchOptions,
) -> Result<usize, MutationError> {
    update_matching(cache, Field::Group, &groups.into(), new_value, options).await
}

/// Clear every entry except those whose decoded `id` is in `preserved`.
///
/// Keys that do not decode are always cleared. Nothing is refetched.
/// Returns the number of cleared entries.
///
/// # Errors
///
/// Returns a [`MutationError`] (operation `delete`, no key) naming the
/// preserved ids if the cache rejects the batch write.
pub async fn reset<C: SwrCache>(
    cache: &C,
    preserved: Option<Targets>,
) -> Result<usize, MutationError> {
    let preserved = preserved.unwrap_or_default();
    let predicate = |raw: &RawKey| match decode(raw) {
        Some(key) => !preserved.contains(key.id()),
        None => true,
    };

    match cache.mutate_matching(predicate, Update::Clear, false).await {
        Ok(cleared) => {
            info!(
                "✓ Cache reset: {} entries cleared, preserved ids [{}]",
                cleared.len(),
                preserved
            );
            Ok(cleared.len())
        }
        Err(e) => Err(MutationError::new(
            format!(
                "Failed to reset cache (preserved ids [{}]): {}",
                preserved, e
            ),
            MutationErrorContext::new(Operation::Delete, None),
            Some(Cause::from(e)),
        )),
    }
}

async fn update_matching<C: SwrCache>(
    cache: &C,
    field: Field,
    targets: &Targets,
    new_value: Option<Value>,
    options: BatchOptions,
) -> Result<usize, MutationError> {
    let (update, default_revalidate) = match &new_value {
        Some(value) => (Update::Set(value.clone()), false),
        None => (Update::Keep, true),
    };
    let revalidate = options.revalidate.unwrap_or(default_revalidate);

    let predicate = |raw: &RawKey| {
        decode(raw).is_some_and(|key| field.of(&key).is_some_and(|v| targets.contains(v)))
    };

    match cache.mutate_matching(predicate, update, revalidate).await {
        Ok(matched) => {
            debug!(
                "✓ Batch update by {} [{}]: {} entries (revalidate: {})",
                field.label(),
                targets,
                matched.len(),
                revalidate
            );
            Ok(matched.len())
        }
        Err(e) => Err(MutationError::new(
            format!(
                "Failed to batch update entries by {} [{}]: {}",
                field.label(),
                targets,
                e
            ),
            MutationErrorContext::new(Operation::Update, None).with_data(new_value),
            Some(Cause::from(e)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemorySwrCache;
    use serde_json::json;

    fn user(id: &str) -> RawKey {
        RawKey::from(StructuredKey::new(id, format!("/api/users/{}", id)).with_group("users"))
    }

    fn seeded() -> InMemorySwrCache {
        let cache = InMemorySwrCache::new();
        cache.insert(user("user-1"), json!({ "name": "Ada" }));
        cache.insert(user("user-2"), json!({ "name": "Bob" }));
        cache.insert(StructuredKey::new("settings", json!("/api/settings")), json!({}));
        cache.insert("/api/unstructured", json!("raw"));
        cache
    }

    #[test]
    fn test_targets_conversions() {
        assert!(Targets::from("a").contains("a"));
        assert_eq!(Targets::from(vec!["a", "b", "a"]).len(), 2);
        assert_eq!(Targets::from(["b", "a"]).to_string(), "a, b");
        assert!(Targets::default().is_empty());
    }

    #[tokio::test]
    async fn test_by_id_matches_only_listed_ids() {
        let cache = seeded();

        let matched = by_id(&cache, "user-1", Some(json!({ "name": "Ada L." })), BatchOptions::default())
            .await
            .expect("Batch update failed");

        assert_eq!(matched, 1);
        assert_eq!(
            cache.get(&user("user-1")).await.expect("Failed to get"),
            Some(json!({ "name": "Ada L." }))
        );
        assert_eq!(
            cache.get(&user("user-2")).await.expect("Failed to get"),
            Some(json!({ "name": "Bob" }))
        );
        assert_eq!(cache.total_revalidations(), 0);
    }

    #[tokio::test]
    async fn test_by_id_without_value_revalidates() {
        let cache = seeded();

        let matched = by_id(&cache, vec!["user-1", "user-2"], None, BatchOptions::default())
            .await
            .expect("Batch update failed");

        assert_eq!(matched, 2);
        assert_eq!(cache.revalidation_count(&user("user-1")), 1);
        assert_eq!(cache.revalidation_count(&user("user-2")), 1);
        assert_eq!(
            cache.get(&user("user-1")).await.expect("Failed to get"),
            Some(json!({ "name": "Ada" }))
        );
    }

    #[tokio::test]
    async fn test_by_group_revalidate_defaults() {
        let cache = seeded();

        by_group(&cache, "users", Some(json!(null)), BatchOptions::default())
            .await
            .expect("Batch update failed");
        assert_eq!(cache.total_revalidations(), 0);

        by_group(&cache, "users", None, BatchOptions::default())
            .await
            .expect("Batch update failed");
        assert_eq!(cache.total_revalidations(), 2);

        by_group(&cache, "users", Some(json!(1)), BatchOptions::default().with_revalidate(true))
            .await
            .expect("Batch update failed");
        assert_eq!(cache.total_revalidations(), 4);
    }

    #[tokio::test]
    async fn test_by_group_ignores_ungrouped_keys() {
        let cache = seeded();

        let matched = by_group(&cache, vec!["users", "settings"], None, BatchOptions::default())
            .await
            .expect("Batch update failed");

        assert_eq!(matched, 2);
    }

    #[tokio::test]
    async fn test_reset_preserves_listed_ids() {
        let cache = seeded();

        let cleared = reset(&cache, Some(Targets::from("settings")))
            .await
            .expect("Reset failed");

        assert_eq!(cleared, 3);
        let settings = RawKey::from(StructuredKey::new("settings", json!("/api/settings")));
        assert_eq!(
            cache.get(&settings).await.expect("Failed to get"),
            Some(json!({}))
        );
        assert_eq!(cache.get(&user("user-1")).await.expect("Failed to get"), None);
        assert_eq!(
            cache
                .get(&RawKey::from("/api/unstructured"))
                .await
                .expect("Failed to get"),
            None
        );
        assert_eq!(cache.total_revalidations(), 0);
    }

    #[tokio::test]
    async fn test_reset_without_preserved_clears_everything() {
        let cache = seeded();
        let cleared = reset(&cache, None).await.expect("Reset failed");
        assert_eq!(cleared, 4);
    }
}
