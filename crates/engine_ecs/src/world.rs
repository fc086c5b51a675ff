// crates/engine_ecs/src/world.rs

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::RwLockReadGuard;

use tracing::trace;

use crate::entity::Entity;
use crate::lookup::ComponentLookupMut;
use crate::storage::{ComponentCell, SparseSet, Storage};
use crate::{Component, EcsError};

pub struct World {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_indices: Vec<u32>,
    live_count: usize,
    // Map Component Type -> Storage
    components: HashMap<TypeId, Box<dyn Storage>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_indices: Vec::new(),
            live_count: 0,
            components: HashMap::new(),
        }
    }

    /// Register a component type with the world.
    /// This MUST be called exactly once per component type.
    pub fn register_component<T: Component>(&mut self) {
        let type_id = TypeId::of::<T>();

        if self.components.contains_key(&type_id) {
            panic!(
                "Component {} registered twice. \
                 Ensure you only call world.register_component::<{}>() once.",
                type_name::<T>(),
                type_name::<T>(),
            );
        }

        self.components
            .insert(type_id, Box::new(ComponentCell::<T>::new()));
    }

    pub fn spawn(&mut self) -> Entity {
        let index = if let Some(idx) = self.free_indices.pop() {
            idx
        } else {
            self.generations.push(0);
            self.alive.push(false);
            (self.generations.len() - 1) as u32
        };

        self.alive[index as usize] = true;
        self.live_count += 1;
        Entity::new(index, self.generations[index as usize])
    }

    /// Destroy `entity` and drop all of its components.
    ///
    /// Bumps the slot generation, so every outstanding handle to it goes
    /// stale. Returns `false` if the entity was already gone.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.exists(entity) {
            return false;
        }

        for storage in self.components.values() {
            storage.remove_entity(entity);
        }

        let index = entity.index();
        self.alive[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_indices.push(index as u32);
        self.live_count -= 1;
        trace!(?entity, "despawned");
        true
    }

    pub fn exists(&self, entity: Entity) -> bool {
        let index = entity.index();
        index < self.generations.len()
            && self.alive[index]
            && self.generations[index] == entity.generation()
    }

    pub fn live_entity_count(&self) -> usize {
        self.live_count
    }

    /// Clone every component of `template` onto a new entity.
    pub fn instantiate(&mut self, template: Entity) -> Result<Entity, EcsError> {
        let mut spawned = self.instantiate_batch(template, 1)?;
        Ok(spawned.remove(0))
    }

    /// Clone every component of `template` onto `count` new entities in one pass.
    ///
    /// Each storage is locked once for the whole batch. `count == 0` allocates
    /// nothing.
    pub fn instantiate_batch(&mut self, template: Entity, count: usize) -> Result<Vec<Entity>, EcsError> {
        if !self.exists(template) {
            return Err(EcsError::DeadEntity(template));
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let spawned: Vec<Entity> = (0..count).map(|_| self.spawn()).collect();
        for storage in self.components.values() {
            storage.copy_to(template, &spawned);
        }
        trace!(?template, count, "instantiated batch");
        Ok(spawned)
    }

    /// STRICT MODE: adding a component to an unregistered type is an error.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        self.cell::<T>()?.write().insert(entity, component);
        Ok(())
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<Option<T>, EcsError> {
        self.ensure_alive(entity)?;
        Ok(self.cell::<T>()?.write().remove(entity))
    }

    /// Returns a copy of the component `T` for `entity`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<T, EcsError> {
        self.ensure_alive(entity)?;
        self.cell::<T>()?
            .read()
            .get(entity)
            .cloned()
            .ok_or(EcsError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })
    }

    /// Overwrite a component the entity already has.
    pub fn set_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        let mut set = self.cell::<T>()?.write();
        let slot = set.get_mut(entity).ok_or(EcsError::MissingComponent {
            entity,
            component: type_name::<T>(),
        })?;
        *slot = component;
        Ok(())
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.exists(entity)
            && self
                .components
                .get(&TypeId::of::<T>())
                .is_some_and(|storage| storage.contains(entity))
    }

    /// Read-only access to the full storage of a component type.
    pub fn query<T: Component>(&self) -> Result<RwLockReadGuard<'_, SparseSet<T>>, EcsError> {
        Ok(self.cell::<T>()?.read())
    }

    /// Random-access write handle that can be moved into a job.
    pub fn lookup_mut<T: Component>(&self) -> Result<ComponentLookupMut<T>, EcsError> {
        Ok(ComponentLookupMut::new(self.cell::<T>()?.shared()))
    }

    fn ensure_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.exists(entity) {
            Ok(())
        } else {
            Err(EcsError::DeadEntity(entity))
        }
    }

    fn cell<T: Component>(&self) -> Result<&ComponentCell<T>, EcsError> {
        let storage = self
            .components
            .get(&TypeId::of::<T>())
            .ok_or(EcsError::Unregistered(type_name::<T>()))?;

        let cell = storage
            .as_any()
            .downcast_ref::<ComponentCell<T>>()
            .unwrap_or_else(|| {
                panic!(
                    "Component storage type mismatch for {}. \
                     Storage was created for a different concrete type.",
                    type_name::<T>(),
                )
            });
        Ok(cell)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
