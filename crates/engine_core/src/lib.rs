// crates/engine_core/src/lib.rs

// Logic Modules
pub mod config;
pub mod engine_loop;
pub mod jobs;
pub mod spawner;

pub use config::{ConfigError, SpawnerConfig};
pub use engine_loop::{EngineLoop, TickSystem};
pub use jobs::JobHandle;
pub use spawner::{
    BatchOutcome, BoltOrigin, BoltSpawner, BoltTemplateSources, BoltTemplates, SpawnError, SpawnQueueWriter,
    SpawnQueues, TickReport,
};
