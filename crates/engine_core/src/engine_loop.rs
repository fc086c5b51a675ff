// crates/engine_core/src/engine_loop.rs

use std::time::Instant;

use engine_ecs::World;
use tracing::{trace, trace_span};

use crate::jobs::JobHandle;
use crate::spawner::{BoltSpawner, SpawnError};

/// A gameplay system run once per fixed simulation step, before the spawner.
/// Producers get their `SpawnQueues` when they are constructed.
pub trait TickSystem {
    fn name(&self) -> &'static str;
    fn run(&mut self, world: &mut World, dt: f32);
}

/// Encapsulates fixed-timestep simulation bookkeeping (time, accumulator, limits)
/// and the completion handle of the spawning still in flight.
pub struct EngineLoop {
    last_frame_time: Instant,
    sim_accumulator: f32,
    sim_dt: f32,
    max_steps_per_frame: u32,
    pending: JobHandle,
    steps: u64,
}

impl EngineLoop {
    pub fn new(sim_dt: f32) -> Self {
        Self {
            last_frame_time: Instant::now(),
            sim_accumulator: 0.0,
            sim_dt,
            max_steps_per_frame: 5,
            pending: JobHandle::completed(),
            steps: 0,
        }
    }

    pub fn sim_dt(&self) -> f32 {
        self.sim_dt
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Update the frame timer and return the clamped frame delta.
    /// Clamps to 0.25s to avoid giant spikes when hitting breakpoints, etc.
    pub fn tick_timer(&mut self) -> f32 {
        let now = Instant::now();
        let frame_dt = now
            .duration_since(self.last_frame_time)
            .as_secs_f32();
        self.last_frame_time = now;

        frame_dt.min(0.25)
    }

    /// Runs fixed-timestep simulation steps until the accumulator is caught up
    /// or we hit max_steps_per_frame. If the backlog still remains at the cap,
    /// we drop it, to avoid "chasing" an infinite backlog under heavy load.
    /// Returns the number of steps taken.
    pub fn update_simulation(
        &mut self,
        frame_dt: f32,
        world: &mut World,
        spawner: &mut BoltSpawner,
        systems: &mut [Box<dyn TickSystem>],
    ) -> Result<u32, SpawnError> {
        self.sim_accumulator += frame_dt;

        let mut steps = 0;
        while self.sim_accumulator >= self.sim_dt && steps < self.max_steps_per_frame {
            self.step(world, spawner, systems)?;
            self.sim_accumulator -= self.sim_dt;
            steps += 1;
        }

        // Prevent unbounded backlog if we're constantly saturated.
        if steps == self.max_steps_per_frame && self.sim_accumulator >= self.sim_dt {
            trace!(backlog = self.sim_accumulator, "dropping simulation backlog");
            self.sim_accumulator = 0.0;
        }
        Ok(steps)
    }

    /// One fixed step: systems, then the spawner.
    ///
    /// Systems get `&mut World` and may destroy entities, so the previous
    /// step's spawning is completed before any of them runs.
    pub fn step(
        &mut self,
        world: &mut World,
        spawner: &mut BoltSpawner,
        systems: &mut [Box<dyn TickSystem>],
    ) -> Result<(), SpawnError> {
        self.steps += 1;
        let _span = trace_span!("sim_step", step = self.steps).entered();

        let dependency = std::mem::take(&mut self.pending);
        dependency.complete();

        for system in systems.iter_mut() {
            let _system = trace_span!("system", name = system.name()).entered();
            system.run(world, self.sim_dt);
        }

        self.pending = spawner.tick(world, dependency)?;
        Ok(())
    }

    /// Wait for any spawning still in flight.
    pub fn flush(&mut self) {
        std::mem::take(&mut self.pending).complete();
    }
}
