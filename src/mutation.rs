//! Create / update / delete mutations against an SWR cache.
//!
//! A [`Mutation`] wraps one remote operation and sequences it with the cache:
//!
//! ```text
//! trigger(args)
//!   ├─ owner unmounted?          -> return Ok(None), nothing touched
//!   ├─ is_mutating = true, error = None
//!   ├─ optimistic transform?     -> snapshot + optimistic write (no refetch)
//!   ├─ remote(args)
//!   │    ├─ Ok  -> revalidate key, return Ok(Some(result))
//!   │    └─ Err -> rollback snapshot (if enabled), wrap in MutationError,
//!   │              error = Some(..), return Err
//!   └─ is_mutating = false (only while still mounted)
//! ```
//!
//! Triggers do not exclude each other. Two concurrent triggers on the same key
//! race at the cache, and a rollback can overwrite another trigger's optimistic
//! write.

use crate::backend::{SwrCache, Update};
use crate::key::{RawKey, StructuredKey};
use crate::lifecycle::MountToken;
use crate::mutation_error::{Cause, MutationError, MutationErrorContext};
use crate::observability::{MutationMetrics, NoOpMetrics};
use crate::operation::Operation;
use crate::optimistic::{self, CacheSnapshot};
use crate::stabilizer::KeyStabilizer;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Computes the optimistic cache value from the current one and the trigger arguments.
///
/// Must be pure. `None` means nothing is cached yet.
pub type OptimisticTransform<A> = Arc<dyn Fn(Option<Value>, &A) -> Value + Send + Sync>;

type RemoteFn<A, R> =
    Arc<dyn Fn(A) -> BoxFuture<'static, std::result::Result<R, Cause>> + Send + Sync>;

/// Extracts the `data` and `id` error context from trigger arguments.
type ContextFn<A> = fn(&A) -> (Option<Value>, Option<String>);

/// Per-mutation configuration.
///
/// # Example
///
/// ```
/// use mutation_kit::MutationOptions;
/// use serde_json::{json, Value};
///
/// let options = MutationOptions::<Value>::default()
///     .with_optimistic_update(|current, todo| {
///         let mut items = current.and_then(|v| v.as_array().cloned()).unwrap_or_default();
///         items.push(todo.clone());
///         Value::Array(items)
///     })
///     .with_rollback_on_error(true);
///
/// assert!(options.optimistic_update.is_some());
/// ```
pub struct MutationOptions<A> {
    /// Transform applied to the cache before the remote call.
    pub optimistic_update: Option<OptimisticTransform<A>>,

    /// Restore the pre-optimistic value when the remote call fails.
    ///
    /// Defaults to `true`. Has no effect without an optimistic update.
    pub rollback_on_error: bool,
}

impl<A> MutationOptions<A> {
    pub fn with_optimistic_update<F>(mut self, transform: F) -> Self
    where
        F: Fn(Option<Value>, &A) -> Value + Send + Sync + 'static,
    {
        self.optimistic_update = Some(Arc::new(transform));
        self
    }

    pub fn with_rollback_on_error(mut self, rollback: bool) -> Self {
        self.rollback_on_error = rollback;
        self
    }
}

impl<A> Default for MutationOptions<A> {
    fn default() -> Self {
        MutationOptions {
            optimistic_update: None,
            rollback_on_error: true,
        }
    }
}

impl<A> Clone for MutationOptions<A> {
    fn clone(&self) -> Self {
        MutationOptions {
            optimistic_update: self.optimistic_update.clone(),
            rollback_on_error: self.rollback_on_error,
        }
    }
}

impl<A> std::fmt::Debug for MutationOptions<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationOptions")
            .field("optimistic_update", &self.optimistic_update.is_some())
            .field("rollback_on_error", &self.rollback_on_error)
            .finish()
    }
}

/// Arguments of an update mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateArgs<T> {
    pub id: String,
    pub data: T,
}

impl<T> UpdateArgs<T> {
    pub fn new(id: impl Into<String>, data: T) -> Self {
        UpdateArgs {
            id: id.into(),
            data,
        }
    }
}

/// Observable state of a mutation.
#[derive(Clone, Debug, Default)]
pub struct MutationState {
    pub is_mutating: bool,
    pub error: Option<MutationError>,
}

/// One remote operation bound to a cache key.
///
/// Built with [`Mutation::create`], [`Mutation::update`] or [`Mutation::delete`].
///
/// # Example
///
/// ```ignore
/// use mutation_kit::{backend::InMemorySwrCache, Mutation, StructuredKey};
/// use serde_json::json;
///
/// let cache = InMemorySwrCache::new();
/// let add_todo = Mutation::create(
///     cache.clone(),
///     Some(StructuredKey::new("todos", json!("/api/todos"))),
///     |todo: serde_json::Value| async move { api.post("/api/todos", todo).await },
/// );
///
/// let created = add_todo.trigger(json!({ "title": "write docs" })).await?;
/// ```
pub struct Mutation<C, A, R> {
    operation: Operation,
    cache: C,
    key: KeyStabilizer,
    remote: RemoteFn<A, R>,
    context_of: ContextFn<A>,
    options: MutationOptions<A>,
    state: watch::Sender<MutationState>,
    mount: MountToken,
    metrics: Box<dyn MutationMetrics>,
}

impl<C, A, R> Mutation<C, A, R>
where
    C: SwrCache,
    A: Send + 'static,
    R: Send + 'static,
{
    fn with_kind<F, Fut, E>(
        operation: Operation,
        cache: C,
        key: Option<StructuredKey>,
        remote: F,
        context_of: ContextFn<A>,
    ) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let stabilizer = KeyStabilizer::new();
        stabilizer.stabilize(key.as_ref());

        let remote: RemoteFn<A, R> = Arc::new(move |args| {
            remote(args)
                .map(|result| result.map_err(Cause::from_error))
                .boxed()
        });
        let (state, _) = watch::channel(MutationState::default());

        Mutation {
            operation,
            cache,
            key: stabilizer,
            remote,
            context_of,
            options: MutationOptions::default(),
            state,
            mount: MountToken::new(),
            metrics: Box::new(NoOpMetrics),
        }
    }

    /// Set mutation options.
    pub fn with_options(mut self, options: MutationOptions<A>) -> Self {
        self.options = options;
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn MutationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Tie this mutation to an owner's lifecycle.
    pub fn with_mount_token(mut self, token: MountToken) -> Self {
        self.mount = token;
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The current stable key.
    pub fn key(&self) -> Option<Arc<StructuredKey>> {
        self.key.current()
    }

    /// Replace the key, keeping the previous `Arc` when it is logically unchanged.
    pub fn rekey(&self, key: Option<&StructuredKey>) -> Option<Arc<StructuredKey>> {
        self.key.stabilize(key)
    }

    pub fn mount_token(&self) -> MountToken {
        self.mount.clone()
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Snapshot of the observable state.
    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn is_mutating(&self) -> bool {
        self.state.borrow().is_mutating
    }

    /// Error of the last failed trigger, cleared when the next one starts.
    pub fn error(&self) -> Option<MutationError> {
        self.state.borrow().error.clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    /// Run the mutation.
    ///
    /// # Returns
    /// - `Ok(Some(result))` - Remote call succeeded and the key was revalidated
    /// - `Ok(None)` - Owner already unmounted, nothing was done
    ///
    /// # Errors
    ///
    /// Returns a [`MutationError`] wrapping the remote failure (or a cache
    /// failure during the optimistic write or revalidation). When the rollback
    /// itself fails, the error wraps the rollback failure instead.
    pub async fn trigger(&self, args: A) -> std::result::Result<Option<R>, MutationError> {
        if !self.mount.is_mounted() {
            debug!("Mutation {} skipped: owner unmounted", self.operation);
            return Ok(None);
        }

        self.state.send_modify(|state| {
            state.is_mutating = true;
            state.error = None;
        });

        let key = self.key.current();
        let raw_key = key.clone().map(RawKey::Structured);
        let label = raw_key
            .as_ref()
            .map(RawKey::serialize)
            .unwrap_or_else(|| "-".to_string());
        let (data, id) = (self.context_of)(&args);
        let timer = Instant::now();

        debug!("» Mutation {} for {}", self.operation, label);

        let mut snapshot = None;
        let outcome = self
            .run(raw_key.as_ref(), &label, args, &mut snapshot)
            .await;

        let result = match outcome {
            Ok(value) => {
                self.metrics
                    .record_success(self.operation, &label, timer.elapsed());
                info!(
                    "✓ Mutation {} for {} succeeded in {:?}",
                    self.operation,
                    label,
                    timer.elapsed()
                );
                Ok(Some(value))
            }
            Err(cause) => {
                let context = MutationErrorContext::new(self.operation, key.as_deref().cloned())
                    .with_data(data)
                    .with_id(id);
                let error = self
                    .settle_failure(raw_key.as_ref(), &label, snapshot, cause, context)
                    .await;

                self.metrics.record_failure(self.operation, &label, &error);
                if self.mount.is_mounted() {
                    self.state
                        .send_modify(|state| state.error = Some(error.clone()));
                }
                Err(error)
            }
        };

        if self.mount.is_mounted() {
            self.state.send_modify(|state| state.is_mutating = false);
        }
        result
    }

    /// Optimistic write, remote call, revalidation.
    async fn run(
        &self,
        key: Option<&RawKey>,
        label: &str,
        args: A,
        snapshot: &mut Option<CacheSnapshot>,
    ) -> std::result::Result<R, Cause> {
        if let Some(transform) = &self.options.optimistic_update {
            *snapshot = Some(optimistic::apply(&self.cache, key, &args, &**transform).await?);
        }

        let value = (self.remote)(args).await?;

        if let Some(key) = key {
            self.cache.mutate(key, Update::Keep, true).await?;
            self.metrics.record_revalidate(label);
        }
        Ok(value)
    }

    async fn settle_failure(
        &self,
        key: Option<&RawKey>,
        label: &str,
        snapshot: Option<CacheSnapshot>,
        cause: Cause,
        context: MutationErrorContext,
    ) -> MutationError {
        if let (true, Some(snapshot)) = (self.options.rollback_on_error, snapshot) {
            if let Err(rollback_error) = optimistic::rollback(&self.cache, key, snapshot).await {
                error!(
                    "✗ Rollback of {} mutation for {} failed: {} (mutation failure: {})",
                    self.operation, label, rollback_error, cause
                );
                return MutationError::new(
                    format!(
                        "Rollback failed after {} mutation: {}",
                        self.operation, rollback_error
                    ),
                    context,
                    Some(Cause::from(rollback_error)),
                );
            }
            self.metrics.record_rollback(self.operation, label);
        }

        MutationError::new(
            format!("{} mutation failed: {}", self.operation, cause),
            context,
            Some(cause),
        )
    }
}

impl<C, A, R> Mutation<C, A, R>
where
    C: SwrCache,
    A: Serialize + Send + 'static,
    R: Send + 'static,
{
    /// Mutation inserting a resource. Failures carry the arguments as `data`.
    pub fn create<F, Fut, E>(cache: C, key: Option<StructuredKey>, remote: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self::with_kind(Operation::Create, cache, key, remote, create_context::<A>)
    }
}

impl<C, T, R> Mutation<C, UpdateArgs<T>, R>
where
    C: SwrCache,
    T: Serialize + Send + 'static,
    R: Send + 'static,
{
    /// Mutation modifying a resource. Failures carry `id` and `data`.
    pub fn update<F, Fut, E>(cache: C, key: Option<StructuredKey>, remote: F) -> Self
    where
        F: Fn(UpdateArgs<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self::with_kind(Operation::Update, cache, key, remote, update_context::<T>)
    }
}

impl<C, R> Mutation<C, String, R>
where
    C: SwrCache,
    R: Send + 'static,
{
    /// Mutation removing the resource with the given id. Failures carry `id`.
    pub fn delete<F, Fut, E>(cache: C, key: Option<StructuredKey>, remote: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self::with_kind(Operation::Delete, cache, key, remote, delete_context)
    }
}

fn create_context<A: Serialize>(args: &A) -> (Option<Value>, Option<String>) {
    (serde_json::to_value(args).ok(), None)
}

fn update_context<T: Serialize>(args: &UpdateArgs<T>) -> (Option<Value>, Option<String>) {
    (serde_json::to_value(&args.data).ok(), Some(args.id.clone()))
}

fn delete_context(id: &String) -> (Option<Value>, Option<String>) {
    (None, Some(id.clone()))
}
