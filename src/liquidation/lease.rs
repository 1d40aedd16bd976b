use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

/// Per-position exclusive execution leases, held in process memory.
///
/// A lease is released when its guard is dropped, including when the
/// owning future is cancelled.
#[derive(Debug, Default)]
pub struct ExecutionLeases {
    held: Mutex<HashSet<String>>,
}

impl ExecutionLeases {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the lease for `position_id`, or `None` if another execution holds it.
    pub fn try_acquire(self: &Arc<Self>, position_id: &str) -> Option<ExecutionLease> {
        let mut held = self.held.lock();
        if !held.insert(position_id.to_string()) {
            return None;
        }
        Some(ExecutionLease {
            leases: Arc::clone(self),
            position_id: position_id.to_string(),
        })
    }

    pub fn is_held(&self, position_id: &str) -> bool {
        self.held.lock().contains(position_id)
    }
}

#[derive(Debug)]
pub struct ExecutionLease {
    leases: Arc<ExecutionLeases>,
    position_id: String,
}

impl Drop for ExecutionLease {
    fn drop(&mut self) {
        self.leases.held.lock().remove(&self.position_id);
    }
}
