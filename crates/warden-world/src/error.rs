//! Error types for the `warden-world` crate.
//!
//! All fallible store operations return [`WorldError`].

use warden_types::{Cell, EntityId};

/// Errors that can occur during entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// No live entity carries the given id.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with the same id is already registered.
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    /// The def name is not registered with the store.
    #[error("unknown def: {0}")]
    UnknownDef(String),

    /// A cell lies outside the map bounds.
    #[error("cell {cell} is out of bounds")]
    OutOfBounds {
        /// The offending cell.
        cell: Cell,
    },

    /// The entity's def does not support the allowed / forbidden toggle.
    #[error("entity {0} is not forbiddable")]
    NotForbiddable(EntityId),

    /// The entity exists but is not spawned on the map.
    #[error("entity {0} is not spawned")]
    NotSpawned(EntityId),
}
