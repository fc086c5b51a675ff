// crates/sandbox/src/scene.rs

use engine_core::BoltTemplateSources;
use engine_ecs::{EcsError, Entity, World};
use engine_shared::{CAiBoltSpawn, CBoltMovement, CPlayerBoltSpawn, CPrefab};
use glam::Vec3;

pub fn setup_world(world: &mut World) {
    world.register_component::<CBoltMovement>();
    world.register_component::<CAiBoltSpawn>();
    world.register_component::<CPlayerBoltSpawn>();
    world.register_component::<CPrefab>();
}

/// Authored bolts the spawner copies its templates from.
pub fn spawn_source_templates(world: &mut World) -> Result<BoltTemplateSources, EcsError> {
    let mut bolt = |speed: f32| -> Result<Entity, EcsError> {
        let e = world.spawn();
        world.add_component(e, CBoltMovement { speed, ..Default::default() })?;
        Ok(e)
    };
    Ok(BoltTemplateSources {
        enemy: bolt(12.0)?,
        ally: bolt(14.0)?,
        player: bolt(30.0)?,
    })
}

/// A ring of turrets around the origin, each aiming at the center.
pub fn spawn_turrets(world: &mut World, count: usize, radius: f32) -> Result<Vec<Entity>, EcsError> {
    let mut turrets = Vec::with_capacity(count);
    for i in 0..count {
        let angle = i as f32 / count as f32 * std::f32::consts::TAU;
        let position = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);

        let turret = world.spawn();
        world.add_component(turret, CAiBoltSpawn {
            position,
            direction: (-position).normalize_or_zero(),
        })?;
        turrets.push(turret);
    }
    Ok(turrets)
}

pub fn spawn_player(world: &mut World) -> Result<Entity, EcsError> {
    let ship = world.spawn();
    world.add_component(ship, CPlayerBoltSpawn {
        position: Vec3::new(0.0, 0.0, -2.0),
        direction: Vec3::Z,
    })?;
    Ok(ship)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turrets_aim_at_the_origin() {
        let mut world = World::new();
        setup_world(&mut world);
        let turrets = spawn_turrets(&mut world, 4, 10.0).unwrap();

        for t in turrets {
            let params = world.get_component::<CAiBoltSpawn>(t).unwrap();
            let to_center = (-params.position).normalize();
            assert!(params.direction.abs_diff_eq(to_center, 1e-5));
            assert!((params.position.length() - 10.0).abs() < 1e-4);
        }
    }
}
