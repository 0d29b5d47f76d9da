//! # mutation-kit
//!
//! Create / update / delete helpers layered on a stale-while-revalidate cache.
//!
//! ## Features
//!
//! - **Structured Keys:** `{ id, group?, data }` keys that batch operations can find again
//! - **Optimistic Updates:** Write the expected value first, roll back on failure
//! - **Batch Invalidation:** Update, refetch or clear entries by id or by group
//! - **Rich Errors:** Every failure arrives as a [`MutationError`] with operation, key and cause
//! - **Cache Agnostic:** Works against any [`SwrCache`], an in-memory one is bundled
//! - **Production Ready:** Built-in logging and metrics hooks
//!
//! ## Quick Start
//!
//! ```ignore
//! use mutation_kit::{
//!     backend::InMemorySwrCache, by_group, BatchOptions, Mutation, MutationOptions,
//!     StructuredKey,
//! };
//! use serde_json::{json, Value};
//!
//! // 1. Create the cache (cheap to clone)
//! let cache = InMemorySwrCache::new();
//! let todos = StructuredKey::new("todos", json!("/api/todos")).with_group("lists");
//!
//! // 2. Bind a remote call to a key
//! let add_todo = Mutation::create(cache.clone(), Some(todos), |todo: Value| async move {
//!     api.post("/api/todos", todo).await
//! })
//! .with_options(MutationOptions::<Value>::default().with_optimistic_update(|current, todo| {
//!     let mut items = current.and_then(|v| v.as_array().cloned()).unwrap_or_default();
//!     items.push(todo.clone());
//!     Value::Array(items)
//! }));
//!
//! // 3. Trigger it: optimistic write, remote call, revalidation
//! add_todo.trigger(json!({ "title": "write docs" })).await?;
//!
//! // 4. Refetch every list at once
//! by_group(&cache, "lists", None, BatchOptions::default()).await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod batch;
pub mod codec;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod mutation;
pub mod mutation_error;
pub mod observability;
pub mod operation;
pub mod optimistic;
pub mod stabilizer;

// Re-exports for convenience
pub use backend::{SwrCache, Update};
pub use batch::{by_group, by_id, reset, BatchOptions, Targets};
pub use codec::decode;
pub use error::{Error, Result};
pub use key::{RawKey, StructuredKey};
pub use lifecycle::MountToken;
pub use mutation::{Mutation, MutationOptions, MutationState, UpdateArgs};
pub use mutation_error::{Cause, MutationError, MutationErrorContext};
pub use operation::Operation;
pub use stabilizer::{stabilize, KeyStabilizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
