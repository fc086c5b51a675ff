// crates/engine_core/src/spawner/initializer.rs

//! Writes spawn parameters into freshly spawned bolts.
//!
//! One read-transform-write ([`apply_spawn_params`]) with two ways to run it:
//! serially on the calling thread, or as one data-parallel job. Both take
//! `sources[i]` -> `spawned[i]` pairs, where every `spawned[i]` is distinct.

use std::any::type_name;

use engine_ecs::{Component, EcsError, Entity, World};
use engine_shared::{CBoltMovement, SpawnParams};
use tracing::debug_span;

use super::queue::BoltOrigin;
use crate::config::SpawnerConfig;
use crate::jobs::JobHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    /// Per-item work too small to pay for dispatch.
    Serial,
    /// One job over the whole batch, chunked by `granularity`.
    Parallel { granularity: usize },
}

impl InitStrategy {
    pub fn for_origin(origin: BoltOrigin, config: &SpawnerConfig) -> Self {
        match origin {
            BoltOrigin::Player => InitStrategy::Serial,
            BoltOrigin::Ai => InitStrategy::Parallel {
                granularity: config.ai_job_granularity.max(1),
            },
        }
    }
}

pub fn apply_spawn_params<P: SpawnParams>(params: &P, movement: &mut CBoltMovement) {
    movement.position = params.position();
    movement.forward = params.direction();
}

/// Initialize `spawned` by `strategy`. Returns the handle callers should
/// chain on (`dependency` itself for the serial path, the new job otherwise)
/// and, when a job was scheduled, how many bolts it writes.
pub fn initialize<P>(
    world: &mut World,
    sources: &[Entity],
    spawned: Vec<Entity>,
    strategy: InitStrategy,
    dependency: JobHandle,
) -> Result<(JobHandle, Option<usize>), EcsError>
where
    P: SpawnParams + Component,
{
    match strategy {
        InitStrategy::Serial => {
            init_serial::<P>(world, sources, spawned)?;
            Ok((dependency, None))
        }
        InitStrategy::Parallel { granularity } => {
            let items = spawned.len();
            let handle = schedule_parallel::<P>(world, sources, spawned, granularity, &dependency)?;
            Ok((handle, Some(items)))
        }
    }
}

/// Direct-write path. `spawned` is released when this returns.
pub fn init_serial<P>(world: &mut World, sources: &[Entity], spawned: Vec<Entity>) -> Result<(), EcsError>
where
    P: SpawnParams + Component,
{
    debug_assert_eq!(sources.len(), spawned.len());
    for (&source, &bolt) in sources.iter().zip(&spawned) {
        let params = world.get_component::<P>(source)?;
        let mut movement = world.get_component::<CBoltMovement>(bolt)?;
        apply_spawn_params(&params, &mut movement);
        world.set_component(bolt, movement)?;
    }
    Ok(())
}

/// Deferred path: one job, gated on `dependency`, that owns `spawned`.
///
/// Spawn parameters are copied out of the sources here, so the job is
/// unaffected by sources destroyed before it runs. The job locks
/// `CBoltMovement` for writing only while it runs. A spawned bolt that
/// vanished before then is a broken precondition and aborts.
pub fn schedule_parallel<P>(
    world: &World,
    sources: &[Entity],
    spawned: Vec<Entity>,
    granularity: usize,
    dependency: &JobHandle,
) -> Result<JobHandle, EcsError>
where
    P: SpawnParams + Component,
{
    debug_assert_eq!(sources.len(), spawned.len());
    let params = resolve_params::<P>(world, sources)?;
    let movement = world.lookup_mut::<CBoltMovement>()?;

    Ok(JobHandle::schedule(dependency, move || {
        let _span = debug_span!("bolt_init_job", count = spawned.len(), granularity).entered();
        let mut movement = movement.write();

        let mut slots = movement
            .disjoint_mut(&spawned)
            .unwrap_or_else(|err| panic!("bolt init job cannot address its bolts: {err}"));

        slots.par_for_each(granularity, |i, bolt| apply_spawn_params(&params[i], bolt));
    }))
}

fn resolve_params<P: Component>(world: &World, sources: &[Entity]) -> Result<Vec<P>, EcsError> {
    let set = world.query::<P>()?;
    sources
        .iter()
        .map(|&source| {
            set.get(source).cloned().ok_or(EcsError::MissingComponent {
                entity: source,
                component: type_name::<P>(),
            })
        })
        .collect()
}
