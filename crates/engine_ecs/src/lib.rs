//! Minimal entity store: generational entities over sparse-set component
//! storage, with owned lookups so jobs can read and write components off the
//! owning thread.

mod entity;
mod error;
mod lookup;
mod storage;
mod world;

pub use entity::Entity;
pub use error::EcsError;
pub use lookup::ComponentLookupMut;
pub use storage::{DisjointSlots, SparseSet};
pub use world::World;

/// Anything storable in the world. Components are cloned when a template is
/// instantiated, and shared with jobs across threads.
pub trait Component: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Component for T {}
