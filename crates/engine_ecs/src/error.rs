// crates/engine_ecs/src/error.rs
use thiserror::Error;

use crate::Entity;

/// Failures reported by the entity store.
///
/// Misuse that can only be a programming error (registering a component
/// twice, a storage poisoned by a panicking job) panics instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("entity {0:?} does not exist")]
    DeadEntity(Entity),

    #[error("component {0} was not registered; call world.register_component::<{0}>() during setup")]
    Unregistered(&'static str),

    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("entity {0:?} appears more than once in a parallel write set")]
    AliasedWrite(Entity),
}
