// crates/sandbox/src/main.rs

mod scene;
mod systems;

use std::thread;
use std::time::Duration;

use anyhow::Result;
use engine_core::{BoltSpawner, EngineLoop, SpawnerConfig, TickSystem};
use engine_ecs::World;
use engine_shared::{CBoltMovement, CPrefab};
use tracing::info;
use tracing_subscriber::EnvFilter;

use systems::{PlayerFire, TurretCleanup, TurretFire};

const SIM_DT: f32 = 1.0 / 60.0;
const FRAMES: u32 = 120;
const TURRETS: usize = 24;

fn init_logging() {
    // SANDBOX_LOG takes the usual filter syntax, e.g. `engine_core=debug`.
    let filter = EnvFilter::try_from_env("SANDBOX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let config = SpawnerConfig::from_env()?;
    info!(?config, "bolt sandbox starting");

    let mut world = World::new();
    scene::setup_world(&mut world);

    let sources = scene::spawn_source_templates(&mut world)?;
    let mut spawner = BoltSpawner::new(&mut world, sources, config)?;
    // The spawner keeps its own copies.
    for source in [sources.enemy, sources.ally, sources.player] {
        world.despawn(source);
    }

    let turrets = scene::spawn_turrets(&mut world, TURRETS, 40.0)?;
    let ship = scene::spawn_player(&mut world)?;

    let queues = spawner.queues();
    let mut systems: Vec<Box<dyn TickSystem>> = vec![
        Box::new(TurretFire { queues: queues.clone(), interval: 0.25, timer: 0.0 }),
        Box::new(PlayerFire { queues, ship }),
        Box::new(TurretCleanup { turrets, at_step: 60, step: 0 }),
    ];

    let mut engine = EngineLoop::new(SIM_DT);
    for _ in 0..FRAMES {
        // Stand-in for presenting a frame.
        thread::sleep(Duration::from_secs_f32(engine.sim_dt()));
        let frame_dt = engine.tick_timer();
        engine.update_simulation(frame_dt, &mut world, &mut spawner, &mut systems)?;
    }
    engine.flush();

    let report = *spawner.last_report();
    info!(
        steps = engine.steps(),
        entities = world.live_entity_count(),
        "simulation finished"
    );

    let sample: Vec<CBoltMovement> = {
        let bolts = world.query::<CBoltMovement>()?;
        bolts
            .iter()
            .filter(|(e, _)| !world.has_component::<CPrefab>(**e))
            .take(5)
            .map(|(_, m)| *m)
            .collect()
    };
    let dump = serde_json::json!({
        "last_tick": report,
        "sample_bolts": sample,
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);

    spawner.shutdown(&mut world);
    Ok(())
}
