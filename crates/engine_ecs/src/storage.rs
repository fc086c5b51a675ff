// crates/engine_ecs/src/storage.rs
use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;

use crate::{Component, EcsError, Entity};

// The trait allows us to treat different component storages generically
pub(crate) trait Storage: Send + Sync {
    fn contains(&self, entity: Entity) -> bool;
    fn remove_entity(&self, entity: Entity);
    /// Clone `source`'s component (if any) onto every entity in `targets`.
    fn copy_to(&self, source: Entity, targets: &[Entity]);
    fn as_any(&self) -> &dyn Any;
}

pub struct SparseSet<T> {
    pub(crate) dense: Vec<T>,                  // Tightly packed data (Cache friendly!)
    pub(crate) entities: Vec<Entity>,          // The entity that owns the data at 'dense[i]'
    pub(crate) sparse: Vec<Option<usize>>,     // Maps Entity Index -> Dense Index
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            entities: Vec::new(),
            sparse: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.dense.reserve(additional);
        self.entities.reserve(additional);
    }

    pub fn insert(&mut self, entity: Entity, value: T) {
        let index = entity.index();

        // Resize sparse array if the entity index is too big
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, None);
        }

        // If this entity already has this component, overwrite it
        if let Some(dense_index) = self.sparse[index] {
            self.dense[dense_index] = value;
            self.entities[dense_index] = entity;
        } else {
            // New component: Push to the end of dense
            let dense_index = self.dense.len();
            self.dense.push(value);
            self.entities.push(entity);
            self.sparse[index] = Some(dense_index);
        }
    }

    /// Slot of `entity` in the dense array. Stale handles resolve to `None`.
    pub fn dense_index(&self, entity: Entity) -> Option<usize> {
        let dense_index = (*self.sparse.get(entity.index())?)?;
        (self.entities[dense_index] == entity).then_some(dense_index)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|i| &self.dense[i])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|i| &mut self.dense[i])
    }

    /// Swap-remove. The last dense element takes the freed slot.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense_index = self.dense_index(entity)?;
        self.sparse[entity.index()] = None;

        let value = self.dense.swap_remove(dense_index);
        self.entities.swap_remove(dense_index);

        if let Some(moved) = self.entities.get(dense_index) {
            self.sparse[moved.index()] = Some(dense_index);
        }
        Some(value)
    }

    // Iterate over (Entity, Component) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&Entity, &T)> {
        self.entities.iter().zip(self.dense.iter())
    }

    /// Resolve `entities` to their dense slots for parallel writing.
    ///
    /// Fails if an entity has no component here, or if two entries resolve
    /// to the same slot. Item `i` of the returned view writes only
    /// `entities[i]`'s component.
    pub fn disjoint_mut(&mut self, entities: &[Entity]) -> Result<DisjointSlots<'_, T>, EcsError> {
        let mut slots = Vec::with_capacity(entities.len());
        for &entity in entities {
            let slot = self.dense_index(entity).ok_or(EcsError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })?;
            slots.push(slot);
        }

        let mut sorted = slots.clone();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(EcsError::AliasedWrite(self.entities[pair[0]]));
        }

        Ok(DisjointSlots {
            base: self.dense.as_mut_ptr(),
            slots,
            _borrow: PhantomData,
        })
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write access to a set of pairwise-distinct slots of one dense array.
///
/// Built only through [`SparseSet::disjoint_mut`], which proves the slots are
/// distinct and in bounds; the array stays exclusively borrowed for `'a`.
pub struct DisjointSlots<'a, T> {
    base: *mut T,
    slots: Vec<usize>,
    _borrow: PhantomData<&'a mut [T]>,
}

// SAFETY: the view owns an exclusive borrow of the dense array; moving it to
// another thread moves `T`s by reference, which requires `T: Send`.
unsafe impl<T: Send> Send for DisjointSlots<'_, T> {}

impl<T: Send> DisjointSlots<'_, T> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run `f(i, &mut slot_i)` for every item on the rayon pool.
    ///
    /// Work is split into chunks of at least `granularity` items. No two
    /// items share a slot, so no locking is needed between them.
    pub fn par_for_each<F>(&mut self, granularity: usize, f: F)
    where
        F: Fn(usize, &mut T) + Send + Sync,
    {
        let base = SlotPtr(self.base);
        self.slots
            .par_iter()
            .enumerate()
            .with_min_len(granularity.max(1))
            .for_each(|(i, &slot)| {
                // SAFETY: `slots` are distinct in-bounds indices of a dense
                // array we borrow mutably, so each `&mut T` is unique.
                let value = unsafe { &mut *base.get().add(slot) };
                f(i, value);
            });
    }
}

struct SlotPtr<T>(*mut T);

impl<T> SlotPtr<T> {
    fn get(&self) -> *mut T {
        self.0
    }
}

// SAFETY: only dereferenced at distinct offsets, see `DisjointSlots`.
unsafe impl<T: Send> Sync for SlotPtr<T> {}
unsafe impl<T: Send> Send for SlotPtr<T> {}

/// One component type's storage, shared with jobs through an `Arc`.
pub(crate) struct ComponentCell<T> {
    set: Arc<RwLock<SparseSet<T>>>,
}

impl<T: Component> ComponentCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            set: Arc::new(RwLock::new(SparseSet::new())),
        }
    }

    pub(crate) fn shared(&self) -> Arc<RwLock<SparseSet<T>>> {
        Arc::clone(&self.set)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, SparseSet<T>> {
        read_set(&self.set)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SparseSet<T>> {
        write_set(&self.set)
    }
}

// A poisoned storage means a job panicked mid-write; there is no recovery.
pub(crate) fn read_set<T>(set: &RwLock<SparseSet<T>>) -> RwLockReadGuard<'_, SparseSet<T>> {
    set.read().unwrap_or_else(|_| {
        panic!("storage for {} poisoned by a panicking writer", type_name::<T>())
    })
}

pub(crate) fn write_set<T>(set: &RwLock<SparseSet<T>>) -> RwLockWriteGuard<'_, SparseSet<T>> {
    set.write().unwrap_or_else(|_| {
        panic!("storage for {} poisoned by a panicking writer", type_name::<T>())
    })
}

// Boilerplate to allow dynamic typing of the storage
impl<T: Component> Storage for ComponentCell<T> {
    fn contains(&self, entity: Entity) -> bool {
        self.read().contains(entity)
    }

    fn remove_entity(&self, entity: Entity) {
        self.write().remove(entity);
    }

    fn copy_to(&self, source: Entity, targets: &[Entity]) {
        let mut set = self.write();
        let Some(value) = set.get(source).cloned() else {
            return;
        };
        set.reserve(targets.len());
        for &target in targets {
            set.insert(target, value.clone());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: u32) -> SparseSet<u32> {
        let mut set = SparseSet::new();
        for i in 0..n {
            set.insert(Entity::new(i, 0), i * 10);
        }
        set
    }

    #[test]
    fn remove_moves_last_element_into_hole() {
        let mut set = filled(3);
        assert_eq!(set.remove(Entity::new(0, 0)), Some(0));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(Entity::new(2, 0)), Some(&20));
        assert_eq!(set.get(Entity::new(1, 0)), Some(&10));
        assert_eq!(set.get(Entity::new(0, 0)), None);
    }

    #[test]
    fn stale_generation_does_not_resolve() {
        let set = filled(2);
        assert!(set.get(Entity::new(1, 1)).is_none());
        assert!(!set.contains(Entity::new(1, 1)));
    }

    #[test]
    fn disjoint_writes_land_on_their_own_entity() {
        let mut set = filled(64);
        let targets: Vec<Entity> = (0..64).rev().step_by(2).map(|i| Entity::new(i, 0)).collect();

        let mut slots = set.disjoint_mut(&targets).unwrap();
        assert_eq!(slots.len(), 32);
        slots.par_for_each(4, |i, value| *value = 1000 + i as u32);

        for (i, target) in targets.iter().enumerate() {
            assert_eq!(set.get(*target), Some(&(1000 + i as u32)));
        }
        assert_eq!(set.get(Entity::new(0, 0)), Some(&0));
    }

    #[test]
    fn disjoint_view_rejects_repeated_entities() {
        let mut set = filled(4);
        let e = Entity::new(2, 0);
        let err = set.disjoint_mut(&[Entity::new(1, 0), e, e]).err();
        assert_eq!(err, Some(EcsError::AliasedWrite(e)));
    }

    #[test]
    fn disjoint_view_rejects_missing_components() {
        let mut set = filled(1);
        let missing = Entity::new(5, 0);
        assert!(matches!(
            set.disjoint_mut(&[missing]),
            Err(EcsError::MissingComponent { entity, .. }) if entity == missing
        ));
    }
}
