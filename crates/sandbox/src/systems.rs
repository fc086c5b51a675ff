// crates/sandbox/src/systems.rs

use engine_core::{SpawnQueues, TickSystem};
use engine_ecs::{Entity, World};
use engine_shared::{CAiBoltSpawn, CPlayerBoltSpawn};
use tracing::{debug, info};

/// Every turret fires once per `interval` seconds.
pub struct TurretFire {
    pub queues: SpawnQueues,
    pub interval: f32,
    pub timer: f32,
}

impl TickSystem for TurretFire {
    fn name(&self) -> &'static str {
        "turret_fire"
    }

    fn run(&mut self, world: &mut World, dt: f32) {
        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }
        self.timer += self.interval;

        let Ok(turrets) = world.query::<CAiBoltSpawn>() else { return };
        for (turret, _) in turrets.iter() {
            self.queues.ai.enqueue(*turret);
        }
        debug!(turrets = turrets.len(), "turret volley");
    }
}

/// The ship fires every step while it is alive.
pub struct PlayerFire {
    pub queues: SpawnQueues,
    pub ship: Entity,
}

impl TickSystem for PlayerFire {
    fn name(&self) -> &'static str {
        "player_fire"
    }

    fn run(&mut self, world: &mut World, _dt: f32) {
        if world.has_component::<CPlayerBoltSpawn>(self.ship) {
            self.queues.player.enqueue(self.ship);
        }
    }
}

/// Destroys every other turret on step `at_step`, after they have enqueued
/// that step's volley.
pub struct TurretCleanup {
    pub turrets: Vec<Entity>,
    pub at_step: u64,
    pub step: u64,
}

impl TickSystem for TurretCleanup {
    fn name(&self) -> &'static str {
        "turret_cleanup"
    }

    fn run(&mut self, world: &mut World, _dt: f32) {
        self.step += 1;
        if self.step != self.at_step {
            return;
        }
        let destroyed = self
            .turrets
            .iter()
            .step_by(2)
            .filter(|t| world.despawn(**t))
            .count();
        info!(destroyed, "turrets destroyed");
    }
}
