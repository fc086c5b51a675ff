// crates/engine_shared/src/components.rs
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Anything a bolt can be launched from: where it appears and which way it flies.
pub trait SpawnParams {
    fn position(&self) -> Vec3;
    fn direction(&self) -> Vec3;
}

/// Authored muzzle data on an AI turret (the *source* entity, never the bolt).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CAiBoltSpawn {
    pub position: Vec3,
    pub direction: Vec3,
}

/// Authored muzzle data on the player ship.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CPlayerBoltSpawn {
    pub position: Vec3,
    pub direction: Vec3,
}

impl SpawnParams for CAiBoltSpawn {
    fn position(&self) -> Vec3 {
        self.position
    }
    fn direction(&self) -> Vec3 {
        self.direction
    }
}

impl SpawnParams for CPlayerBoltSpawn {
    fn position(&self) -> Vec3 {
        self.position
    }
    fn direction(&self) -> Vec3 {
        self.direction
    }
}

/// Live bolt state. Position and forward are written once at spawn; speed
/// comes from the template.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CBoltMovement {
    pub position: Vec3,
    pub forward: Vec3,
    pub speed: f32,
}

impl Default for CBoltMovement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            speed: 0.0,
        }
    }
}

/// Marks a template entity: never simulated, only cloned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CPrefab;
