// crates/engine_shared/src/lib.rs

pub mod components;

pub use components::{CAiBoltSpawn, CBoltMovement, CPlayerBoltSpawn, CPrefab, SpawnParams};
pub use glam;
