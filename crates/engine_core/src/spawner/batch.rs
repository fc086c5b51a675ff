// crates/engine_core/src/spawner/batch.rs

use engine_ecs::{Entity, World};
use serde::Serialize;
use tracing::{debug, trace_span};

use super::queue::SpawnQueue;

/// What one queue drain did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub drained: usize,
    pub kept: usize,
}

impl FilterStats {
    /// Requests whose source entity was destroyed before the drain.
    pub fn dropped(&self) -> usize {
        self.drained - self.kept
    }
}

/// Drain `queue` into `list`, keeping only sources that are still alive.
///
/// Survivors keep their enqueue order. An empty queue is a no-op. When the
/// queue holds more requests than `list` has capacity, the capacity is
/// doubled up front; pushes past that grow the list as usual. Dropped
/// requests are gone for good.
pub fn fill_batch_list(world: &World, queue: &SpawnQueue, list: &mut Vec<Entity>) -> FilterStats {
    let pending = queue.len();
    if pending == 0 {
        return FilterStats::default();
    }

    let _span = trace_span!("fill_batch_list", pending).entered();

    if pending > list.capacity() {
        let target = list.capacity().max(1) * 2;
        list.reserve_exact(target - list.len());
    }

    let mut stats = FilterStats::default();
    for source in queue.drain() {
        stats.drained += 1;
        if world.exists(source) {
            list.push(source);
            stats.kept += 1;
        }
    }

    if stats.dropped() > 0 {
        debug!(dropped = stats.dropped(), kept = stats.kept, "discarded requests from destroyed sources");
    }
    stats
}
