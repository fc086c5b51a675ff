// crates/engine_core/src/spawner/mod.rs

//! Bolt spawner: queue -> filtered batch -> batch instancing -> initialization.
//!
//! ```text
//!  producers (any thread)          tick thread                         rayon pool
//!  ──────────────────────          ───────────                         ──────────
//!  SpawnQueues.ai.enqueue ──┐
//!                           ├──> fill_batch_list ──> spawn_batch(player)  (serial write)
//!  SpawnQueues.player.enq ──┘                   └──> spawn_batch(ai) ───> bolt_init_job
//!                                                          │                   │
//!                                               JobHandle <┴───── chained ─────┘
//! ```
//!
//! Producers only hold [`SpawnQueues`]; they are handed the writers when they
//! are built instead of looking them up through the world.

pub mod batch;
pub mod initializer;
pub mod queue;

use engine_ecs::{EcsError, Entity, World};
use engine_shared::{CAiBoltSpawn, CPlayerBoltSpawn, CPrefab};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info_span};

use crate::config::SpawnerConfig;
use crate::jobs::JobHandle;
use batch::{fill_batch_list, FilterStats};
use initializer::{initialize, InitStrategy};
pub use queue::{BoltOrigin, SpawnQueue, SpawnQueueWriter, SpawnQueues};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Store(#[from] EcsError),

    #[error("template {0:?} lost its prefab marker")]
    TemplateNotPrefab(Entity),
}

/// Externally authored bolt entities the spawner copies its templates from.
#[derive(Debug, Clone, Copy)]
pub struct BoltTemplateSources {
    pub enemy: Entity,
    pub ally: Entity,
    pub player: Entity,
}

/// The spawner's own template entities, each tagged with [`CPrefab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoltTemplates {
    pub enemy: Entity,
    pub ally: Entity,
    pub player: Entity,
}

impl BoltTemplates {
    pub fn for_origin(&self, origin: BoltOrigin) -> Entity {
        match origin {
            BoltOrigin::Ai => self.enemy,
            BoltOrigin::Player => self.player,
        }
    }

    pub fn all(&self) -> [Entity; 3] {
        [self.enemy, self.ally, self.player]
    }
}

/// Result of one [`BoltSpawner::spawn_batch`] call.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub handle: JobHandle,
    /// `spawned[i]` was created for `batch[i]`.
    pub spawned: Vec<Entity>,
    /// Bolts written by the scheduled job, `None` when written inline.
    pub job_items: Option<usize>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub ai: FilterStats,
    pub player: FilterStats,
    pub ai_spawned: usize,
    pub player_spawned: usize,
    pub ai_job_items: Option<usize>,
}

pub struct BoltSpawner {
    config: SpawnerConfig,
    templates: BoltTemplates,
    ai_queue: SpawnQueue,
    player_queue: SpawnQueue,
    ai_batch: Vec<Entity>,
    player_batch: Vec<Entity>,
    ai_spawned: Vec<Entity>,
    player_spawned: Vec<Entity>,
    ticks: u64,
    last_report: TickReport,
}

impl BoltSpawner {
    /// Clone the three source templates into prefab templates and set up the
    /// queues. The world must already have the bolt components registered.
    pub fn new(world: &mut World, sources: BoltTemplateSources, config: SpawnerConfig) -> Result<Self, SpawnError> {
        let config = config.sanitized();
        let templates = BoltTemplates {
            enemy: Self::create_template(world, sources.enemy)?,
            ally: Self::create_template(world, sources.ally)?,
            player: Self::create_template(world, sources.player)?,
        };
        debug!(?templates, ?config, "bolt spawner ready");

        Ok(Self {
            config,
            templates,
            ai_queue: SpawnQueue::new(),
            player_queue: SpawnQueue::new(),
            ai_batch: Vec::with_capacity(config.initial_batch_capacity),
            player_batch: Vec::with_capacity(config.initial_batch_capacity),
            ai_spawned: Vec::new(),
            player_spawned: Vec::new(),
            ticks: 0,
            last_report: TickReport::default(),
        })
    }

    fn create_template(world: &mut World, source: Entity) -> Result<Entity, SpawnError> {
        let template = world.instantiate(source)?;
        world.add_component(template, CPrefab)?;
        Ok(template)
    }

    pub fn queues(&self) -> SpawnQueues {
        SpawnQueues {
            ai: self.ai_queue.writer(),
            player: self.player_queue.writer(),
        }
    }

    pub fn templates(&self) -> BoltTemplates {
        self.templates
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    /// Bolts created by the last tick for `origin`, aligned with that tick's
    /// filtered batch.
    pub fn last_spawned(&self, origin: BoltOrigin) -> &[Entity] {
        match origin {
            BoltOrigin::Ai => &self.ai_spawned,
            BoltOrigin::Player => &self.player_spawned,
        }
    }

    /// Capacities of the (ai, player) batch lists.
    pub fn batch_capacities(&self) -> (usize, usize) {
        (self.ai_batch.capacity(), self.player_batch.capacity())
    }

    /// One spawner tick. Player bolts are created and written first, then AI
    /// bolts get a job chained after `dependency`. The returned handle covers
    /// all spawning done this tick.
    pub fn tick(&mut self, world: &mut World, dependency: JobHandle) -> Result<JobHandle, SpawnError> {
        self.ticks += 1;

        self.ai_batch.clear();
        self.player_batch.clear();

        let ai = fill_batch_list(world, &self.ai_queue, &mut self.ai_batch);
        let player = fill_batch_list(world, &self.player_queue, &mut self.player_batch);

        let player_out = self.spawn_batch(
            world,
            &self.player_batch,
            self.templates.for_origin(BoltOrigin::Player),
            BoltOrigin::Player,
            dependency,
        )?;
        let ai_out = self.spawn_batch(
            world,
            &self.ai_batch,
            self.templates.for_origin(BoltOrigin::Ai),
            BoltOrigin::Ai,
            player_out.handle,
        )?;

        self.last_report = TickReport {
            tick: self.ticks,
            ai,
            player,
            ai_spawned: ai_out.spawned.len(),
            player_spawned: player_out.spawned.len(),
            ai_job_items: ai_out.job_items,
        };
        self.ai_spawned = ai_out.spawned;
        self.player_spawned = player_out.spawned;
        Ok(ai_out.handle)
    }

    /// Spawn one bolt per entry of `batch` from `template`.
    ///
    /// `spawned[i]` takes its movement from `batch[i]`'s spawn parameters. An
    /// empty batch does nothing and hands `dependency` straight back.
    pub fn spawn_batch(
        &self,
        world: &mut World,
        batch: &[Entity],
        template: Entity,
        origin: BoltOrigin,
        dependency: JobHandle,
    ) -> Result<BatchOutcome, SpawnError> {
        if batch.is_empty() {
            return Ok(BatchOutcome {
                handle: dependency,
                spawned: Vec::new(),
                job_items: None,
            });
        }

        let count = batch.len();
        let _span = info_span!("spawn_batch", %origin, count).entered();

        if !world.has_component::<CPrefab>(template) {
            return Err(SpawnError::TemplateNotPrefab(template));
        }

        // Strip the marker once on a seed instead of once per bolt.
        let seed = world.instantiate(template)?;
        world.remove_component::<CPrefab>(seed)?;
        let spawned = world.instantiate_batch(seed, count)?;
        world.despawn(seed);

        let strategy = InitStrategy::for_origin(origin, &self.config);
        let job_input = spawned.clone();
        let (handle, job_items) = match origin {
            BoltOrigin::Ai => initialize::<CAiBoltSpawn>(world, batch, job_input, strategy, dependency)?,
            BoltOrigin::Player => initialize::<CPlayerBoltSpawn>(world, batch, job_input, strategy, dependency)?,
        };

        Ok(BatchOutcome {
            handle,
            spawned,
            job_items,
        })
    }

    /// Destroy the templates. Queues and batch lists go with `self`.
    pub fn shutdown(self, world: &mut World) {
        for template in self.templates.all() {
            world.despawn(template);
        }
        debug!(ticks = self.ticks, "bolt spawner shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_shared::CBoltMovement;
    use glam::Vec3;
    use std::sync::mpsc;

    struct Fixture {
        world: World,
        spawner: BoltSpawner,
        queues: SpawnQueues,
    }

    fn fixture() -> Fixture {
        let mut world = World::new();
        world.register_component::<CBoltMovement>();
        world.register_component::<CAiBoltSpawn>();
        world.register_component::<CPlayerBoltSpawn>();
        world.register_component::<CPrefab>();

        let mut bolt = |speed: f32| {
            let e = world.spawn();
            world
                .add_component(e, CBoltMovement { speed, ..Default::default() })
                .unwrap();
            e
        };
        let sources = BoltTemplateSources {
            enemy: bolt(10.0),
            ally: bolt(11.0),
            player: bolt(20.0),
        };

        let spawner = BoltSpawner::new(&mut world, sources, SpawnerConfig::default()).unwrap();
        let queues = spawner.queues();
        Fixture { world, spawner, queues }
    }

    fn turret(world: &mut World, position: Vec3, direction: Vec3) -> Entity {
        let e = world.spawn();
        world.add_component(e, CAiBoltSpawn { position, direction }).unwrap();
        e
    }

    fn ship(world: &mut World, position: Vec3, direction: Vec3) -> Entity {
        let e = world.spawn();
        world.add_component(e, CPlayerBoltSpawn { position, direction }).unwrap();
        e
    }

    /// Movement of the bolts the last tick spawned for `origin`, in batch order.
    fn bolts(f: &Fixture, origin: BoltOrigin) -> Vec<CBoltMovement> {
        f.spawner
            .last_spawned(origin)
            .iter()
            .map(|e| f.world.get_component::<CBoltMovement>(*e).unwrap())
            .collect()
    }

    #[test]
    fn templates_carry_the_prefab_marker() {
        let f = fixture();
        for template in f.spawner.templates().all() {
            assert!(f.world.has_component::<CPrefab>(template));
        }
    }

    #[test]
    fn ai_batch_is_initialized_by_one_job_in_enqueue_order() {
        let mut f = fixture();
        let a = turret(&mut f.world, Vec3::ZERO, Vec3::Z);
        let b = turret(&mut f.world, Vec3::X, Vec3::Y);
        f.queues.ai.enqueue(a);
        f.queues.ai.enqueue(b);

        let before = f.world.live_entity_count();
        let handle = f.spawner.tick(&mut f.world, JobHandle::completed()).unwrap();
        handle.complete();

        let report = *f.spawner.last_report();
        assert_eq!(report.ai_spawned, 2);
        assert_eq!(report.ai_job_items, Some(2));
        assert_eq!(f.world.live_entity_count(), before + 2);

        let bolts = bolts(&f, BoltOrigin::Ai);
        assert_eq!((bolts[0].position, bolts[0].forward), (Vec3::ZERO, Vec3::Z));
        assert_eq!((bolts[1].position, bolts[1].forward), (Vec3::X, Vec3::Y));
        assert!(bolts.iter().all(|m| m.speed == 10.0));
    }

    #[test]
    fn job_size_matches_filtered_batch() {
        let mut f = fixture();
        let live = turret(&mut f.world, Vec3::X, Vec3::X);
        let doomed = turret(&mut f.world, Vec3::Y, Vec3::Y);
        for _ in 0..40 {
            f.queues.ai.enqueue(live);
            f.queues.ai.enqueue(doomed);
        }
        f.world.despawn(doomed);

        f.spawner.tick(&mut f.world, JobHandle::completed()).unwrap().complete();

        let report = *f.spawner.last_report();
        assert_eq!(report.ai, FilterStats { drained: 80, kept: 40 });
        assert_eq!(report.ai_job_items, Some(40));
        assert_eq!(f.spawner.last_spawned(BoltOrigin::Ai).len(), 40);
    }

    #[test]
    fn recycled_slots_keep_bolts_aligned_with_requests() {
        let mut f = fixture();
        let turrets: Vec<Entity> = (0..4)
            .map(|i| turret(&mut f.world, Vec3::new(i as f32, 1.0, 0.0), Vec3::X * (i + 1) as f32))
            .collect();
        // Free a run of slots so the batch reuses them, highest index first.
        let freed: Vec<Entity> = (0..6).map(|_| f.world.spawn()).collect();
        for e in &freed {
            f.world.despawn(*e);
        }

        let order = [turrets[2], turrets[0], turrets[3], turrets[1]];
        for t in order {
            f.queues.ai.enqueue(t);
        }
        f.spawner.tick(&mut f.world, JobHandle::completed()).unwrap().complete();

        let spawned = f.spawner.last_spawned(BoltOrigin::Ai).to_vec();
        assert_eq!(spawned.len(), 4);
        assert!(spawned.iter().all(|e| freed.iter().any(|r| r.index() == e.index())));
        assert!(spawned.windows(2).all(|w| w[0].index() > w[1].index()));

        for (bolt, source) in spawned.iter().zip(order) {
            let params = f.world.get_component::<CAiBoltSpawn>(source).unwrap();
            let movement = f.world.get_component::<CBoltMovement>(*bolt).unwrap();
            assert_eq!((movement.position, movement.forward), (params.position, params.direction));
        }
    }

    #[test]
    fn source_destroyed_while_job_is_pending_still_initializes_its_bolt() {
        let mut f = fixture();
        let a = turret(&mut f.world, Vec3::splat(7.0), Vec3::NEG_X);
        f.queues.ai.enqueue(a);

        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let upstream = JobHandle::schedule(&JobHandle::completed(), move || {
            gate_rx.recv().unwrap();
        });

        let handle = f.spawner.tick(&mut f.world, upstream).unwrap();
        assert!(!handle.is_completed());
        f.world.despawn(a);
        gate_tx.send(()).unwrap();
        handle.complete();

        let bolts = bolts(&f, BoltOrigin::Ai);
        assert_eq!(bolts.len(), 1);
        assert_eq!(bolts[0].position, Vec3::splat(7.0));
        assert_eq!(bolts[0].forward, Vec3::NEG_X);
    }

    #[test]
    fn destroyed_source_is_filtered_out() {
        let mut f = fixture();
        let a = turret(&mut f.world, Vec3::ZERO, Vec3::Z);
        let b = turret(&mut f.world, Vec3::X, Vec3::Y);
        f.queues.ai.enqueue(a);
        f.queues.ai.enqueue(b);
        f.world.despawn(a);

        f.spawner.tick(&mut f.world, JobHandle::completed()).unwrap().complete();

        let report = *f.spawner.last_report();
        assert_eq!(report.ai, FilterStats { drained: 2, kept: 1 });
        let bolts = bolts(&f, BoltOrigin::Ai);
        assert_eq!(bolts.len(), 1);
        assert_eq!(bolts[0].position, Vec3::X);
    }

    #[test]
    fn player_batch_is_written_synchronously() {
        let mut f = fixture();
        let s = ship(&mut f.world, Vec3::new(3.0, 4.0, 5.0), Vec3::NEG_Z);
        for _ in 0..100 {
            f.queues.player.enqueue(s);
        }

        let handle = f.spawner.tick(&mut f.world, JobHandle::completed()).unwrap();

        // Nothing was scheduled, so the tick's handle is the completed input.
        assert!(handle.same_job(&JobHandle::completed()));
        let report = *f.spawner.last_report();
        assert_eq!(report.player_spawned, 100);
        assert_eq!(report.ai_job_items, None);

        let bolts = bolts(&f, BoltOrigin::Player);
        assert_eq!(bolts.len(), 100);
        assert!(bolts.iter().all(|m| m.position == Vec3::new(3.0, 4.0, 5.0)
            && m.forward == Vec3::NEG_Z
            && m.speed == 20.0));
    }

    #[test]
    fn empty_tick_spawns_nothing_and_returns_dependency() {
        let mut f = fixture();
        let before = f.world.live_entity_count();
        let capacities = f.spawner.batch_capacities();
        let dependency = JobHandle::schedule(&JobHandle::completed(), || {});

        let handle = f.spawner.tick(&mut f.world, dependency.clone()).unwrap();

        assert!(handle.same_job(&dependency));
        assert_eq!(f.world.live_entity_count(), before);
        assert_eq!(f.spawner.batch_capacities(), capacities);
        assert_eq!(f.spawner.last_report().ai_spawned, 0);
        assert!(f.spawner.last_spawned(BoltOrigin::Ai).is_empty());
        handle.complete();
    }

    #[test]
    fn spawned_bolts_do_not_keep_the_marker_or_the_seed() {
        let mut f = fixture();
        let t = turret(&mut f.world, Vec3::ZERO, Vec3::X);
        for _ in 0..5 {
            f.queues.ai.enqueue(t);
        }
        let before = f.world.live_entity_count();
        f.spawner.tick(&mut f.world, JobHandle::completed()).unwrap().complete();

        // Exactly five new entities: the seed clone is gone again.
        assert_eq!(f.world.live_entity_count(), before + 5);
        for bolt in f.spawner.last_spawned(BoltOrigin::Ai) {
            assert!(!f.world.has_component::<CPrefab>(*bolt));
        }
        let prefab_count = f.world.query::<CPrefab>().unwrap().len();
        assert_eq!(prefab_count, 3);
    }

    #[test]
    fn spawn_batch_pairs_each_bolt_with_its_request() {
        let mut f = fixture();
        let a = ship(&mut f.world, Vec3::X, Vec3::Y);
        let b = ship(&mut f.world, Vec3::Z, Vec3::NEG_Y);
        let player = f.spawner.templates().player;

        let out = f
            .spawner
            .spawn_batch(&mut f.world, &[b, a, b], player, BoltOrigin::Player, JobHandle::completed())
            .unwrap();

        assert_eq!(out.job_items, None);
        let positions: Vec<Vec3> = out
            .spawned
            .iter()
            .map(|e| f.world.get_component::<CBoltMovement>(*e).unwrap().position)
            .collect();
        assert_eq!(positions, vec![Vec3::Z, Vec3::X, Vec3::Z]);
    }

    #[test]
    fn missing_marker_on_template_is_reported() {
        let mut f = fixture();
        let t = turret(&mut f.world, Vec3::ZERO, Vec3::X);
        let enemy = f.spawner.templates().enemy;
        f.world.remove_component::<CPrefab>(enemy).unwrap();

        let err = f
            .spawner
            .spawn_batch(&mut f.world, &[t], enemy, BoltOrigin::Ai, JobHandle::completed())
            .unwrap_err();
        assert!(matches!(err, SpawnError::TemplateNotPrefab(e) if e == enemy));
    }

    #[test]
    fn shutdown_destroys_templates() {
        let mut f = fixture();
        let templates = f.spawner.templates();
        f.spawner.shutdown(&mut f.world);
        for template in templates.all() {
            assert!(!f.world.exists(template));
        }
        // Writers outlive the spawner harmlessly.
        f.queues.ai.enqueue(templates.enemy);
    }
}
