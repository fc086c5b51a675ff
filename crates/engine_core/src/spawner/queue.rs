// crates/engine_core/src/spawner/queue.rs

use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use engine_ecs::Entity;
use serde::Serialize;
use tracing::trace;

/// Which producer family a spawn request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BoltOrigin {
    Ai,
    Player,
}

impl fmt::Display for BoltOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltOrigin::Ai => f.write_str("ai"),
            BoltOrigin::Player => f.write_str("player"),
        }
    }
}

/// Unbounded queue of source entities. Any number of writers, one reader.
///
/// The reader half never leaves this struct, and the struct is not `Clone`,
/// so whoever owns it is the only consumer.
pub struct SpawnQueue {
    sender: Sender<Entity>,
    receiver: Receiver<Entity>,
}

impl SpawnQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn writer(&self) -> SpawnQueueWriter {
        SpawnQueueWriter {
            sender: self.sender.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Yields queued entities in FIFO order until the queue is empty.
    pub(crate) fn drain(&self) -> impl Iterator<Item = Entity> + '_ {
        self.receiver.try_iter()
    }
}

impl Default for SpawnQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer-side handle. Enqueueing is the only thing a producer can do.
#[derive(Clone, Debug)]
pub struct SpawnQueueWriter {
    sender: Sender<Entity>,
}

impl SpawnQueueWriter {
    /// Request a bolt fired from `source`. Requests sent after the spawner
    /// is gone are dropped.
    pub fn enqueue(&self, source: Entity) {
        if self.sender.send(source).is_err() {
            trace!(?source, "spawn queue closed; request dropped");
        }
    }
}

/// The writer pair handed to producer systems at construction time.
#[derive(Clone, Debug)]
pub struct SpawnQueues {
    pub ai: SpawnQueueWriter,
    pub player: SpawnQueueWriter,
}
