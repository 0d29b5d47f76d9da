//! Metrics hooks for mutations.
//!
//! Implement [`MutationMetrics`] to feed mutation outcomes into your
//! monitoring system:
//!
//! ```ignore
//! use mutation_kit::observability::MutationMetrics;
//! use mutation_kit::operation::Operation;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl MutationMetrics for PrometheusMetrics {
//!     fn record_success(&self, operation: Operation, _key: &str, duration: Duration) {
//!         // counter!("mutations_ok", "op" => operation.to_string()).inc();
//!         // histogram!("mutation_latency").record(duration);
//!     }
//!     // ... implement other methods
//! }
//!
//! // let mutation = Mutation::create(cache, key, remote)
//! //     .with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! A [`Mutation`](crate::Mutation) defaults to [`NoOpMetrics`]. [`LogMetrics`]
//! keeps the default method bodies, which log through the `log` crate.
//!
//! `key` is the serialized cache key, or `"-"` for a mutation without a key.

use crate::mutation_error::MutationError;
use crate::operation::Operation;
use std::time::Duration;

/// Trait for mutation metrics collection.
pub trait MutationMetrics: Send + Sync {
    /// Record a mutation whose remote call and revalidation succeeded.
    fn record_success(&self, operation: Operation, key: &str, duration: Duration) {
        debug!("Mutation {} OK: {} took {:?}", operation, key, duration);
    }

    /// Record a failed mutation.
    fn record_failure(&self, operation: Operation, key: &str, error: &MutationError) {
        warn!("Mutation {} FAILED for {}: {}", operation, key, error);
    }

    /// Record an optimistic write being rolled back.
    fn record_rollback(&self, operation: Operation, key: &str) {
        debug!("Mutation {} ROLLBACK: {}", operation, key);
    }

    /// Record a revalidation issued after a successful mutation.
    fn record_revalidate(&self, key: &str) {
        debug!("Mutation REVALIDATE: {}", key);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Debug, Default)]
pub struct NoOpMetrics;

impl MutationMetrics for NoOpMetrics {
    fn record_success(&self, _operation: Operation, _key: &str, _duration: Duration) {}
    fn record_failure(&self, _operation: Operation, _key: &str, _error: &MutationError) {}
    fn record_rollback(&self, _operation: Operation, _key: &str) {}
    fn record_revalidate(&self, _key: &str) {}
}

/// Metrics that only log.
#[derive(Clone, Debug, Default)]
pub struct LogMetrics;

impl MutationMetrics for LogMetrics {}
