//! Optimistic cache writes and their rollback.
//!
//! ```text
//! snapshot = read(key)
//! write(key, transform(snapshot, payload), revalidate = false)
//! ... remote call ...
//! on failure: write(key, snapshot, revalidate = false)
//! ```
//!
//! Neither write triggers a refetch. Nothing fences concurrent mutations on the
//! same key: a rollback restores its own snapshot even if another optimistic
//! write landed in between.

use crate::backend::{SwrCache, Update};
use crate::error::Result;
use crate::key::RawKey;
use serde_json::Value;

/// Value cached right before an optimistic write.
///
/// Lives only for the duration of one mutation attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheSnapshot(Option<Value>);

impl CacheSnapshot {
    /// The previous value. `None` means nothing was cached yet.
    pub fn value(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    pub fn into_inner(self) -> Option<Value> {
        self.0
    }
}

/// Apply an optimistic write and return what it replaced.
///
/// `transform` receives the current value (`None` when not cached yet) and
/// the payload. With no key nothing is read or written.
///
/// # Errors
/// Returns `Err` if the cache read or write fails
pub async fn apply<C, P, F>(
    cache: &C,
    key: Option<&RawKey>,
    payload: &P,
    transform: F,
) -> Result<CacheSnapshot>
where
    C: SwrCache,
    P: ?Sized,
    F: FnOnce(Option<Value>, &P) -> Value,
{
    let Some(key) = key else {
        debug!("Optimistic update skipped: no key");
        return Ok(CacheSnapshot(None));
    };

    let previous = cache.get(key).await?;
    let next = transform(previous.clone(), payload);
    cache.mutate(key, Update::Set(next), false).await?;

    debug!("» Optimistic update applied for {}", key.serialize());
    Ok(CacheSnapshot(previous))
}

/// Restore a snapshot taken by [`apply`].
///
/// An empty snapshot clears the entry again.
///
/// # Errors
/// Returns `Err` if the cache write fails
pub async fn rollback<C: SwrCache>(
    cache: &C,
    key: Option<&RawKey>,
    snapshot: CacheSnapshot,
) -> Result<()> {
    let Some(key) = key else {
        return Ok(());
    };

    let update = match snapshot.into_inner() {
        Some(previous) => Update::Set(previous),
        None => Update::Clear,
    };
    cache.mutate(key, update, false).await?;

    debug!("« Optimistic update rolled back for {}", key.serialize());
    Ok(())
}
