//! Owner lifecycle tracking for mutations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token marking whether the owner of a mutation is still alive.
///
/// Unmounting does not cancel remote calls or cache writes already in flight.
/// It only stops them from touching observable mutation state, and makes new
/// triggers return without doing anything. Clones share the same flag.
#[derive(Clone, Debug)]
pub struct MountToken {
    unmounted: Arc<AtomicBool>,
}

impl MountToken {
    /// A token for a mounted owner.
    pub fn new() -> Self {
        MountToken {
            unmounted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the owner as torn down. Irreversible.
    pub fn unmount(&self) {
        if !self.unmounted.swap(true, Ordering::AcqRel) {
            debug!("Mutation owner unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.unmounted.load(Ordering::Acquire)
    }
}

impl Default for MountToken {
    fn default() -> Self {
        Self::new()
    }
}
