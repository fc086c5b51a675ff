// crates/engine_ecs/src/lookup.rs

//! Owned, random-access handle to a single component storage.
//!
//! A lookup can be moved into a job and outlive the `&World` borrow that
//! produced it. Locking happens when the job calls `write()`, so a job that
//! is still waiting on its dependencies holds nothing.

use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crate::storage::write_set;
use crate::SparseSet;

/// Writable lookup (e.g. movement data keyed by freshly spawned entity).
pub struct ComponentLookupMut<T> {
    set: Arc<RwLock<SparseSet<T>>>,
}

impl<T> ComponentLookupMut<T> {
    pub(crate) fn new(set: Arc<RwLock<SparseSet<T>>>) -> Self {
        Self { set }
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SparseSet<T>> {
        write_set(&self.set)
    }
}
