//! Port Registry
//!
//! Ports already handed to a cluster by this process. Append-only for its
//! lifetime; `clear` is for full-process shutdown or test isolation.
//!
//! [`PortRegistry::shared`] is the process-wide instance: created on first
//! use, shared by every cluster started through `start_cluster`.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static SHARED: OnceLock<Arc<PortRegistry>> = OnceLock::new();

#[derive(Debug, Default)]
pub struct PortRegistry {
    taken: Mutex<BTreeSet<u16>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn shared() -> Arc<PortRegistry> {
        SHARED.get_or_init(|| Arc::new(PortRegistry::new())).clone()
    }

    /// Record `port` as taken. Returns false if it already was.
    pub fn claim(&self, port: u16) -> bool {
        self.lock().insert(port)
    }

    pub fn is_taken(&self, port: u16) -> bool {
        self.lock().contains(&port)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<u16>> {
        // The set is always consistent, even after a panic elsewhere.
        self.taken.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
