//! Entity store abstraction and in-memory reference map for Warden.
//!
//! The simulation owns its entities; this crate defines the accessor
//! surface the tool engine needs from it and ships a reference store.
//!
//! # Modules
//!
//! - [`error`] -- Error types for store operations.
//! - [`store`] -- The [`EntityStore`] trait: bounds, enumeration, per-cell
//!   and def lookup, stockpile lookup, and the forbidden toggle.
//! - [`thing_map`] -- [`ThingMap`], a `BTreeMap`-backed [`EntityStore`].
//! - [`starting_world`] -- Default def catalogue and seeded starting map.

pub mod error;
pub mod starting_world;
pub mod store;
pub mod thing_map;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use starting_world::{StartingWorldSpec, create_starting_world, standard_defs};
pub use store::EntityStore;
pub use thing_map::ThingMap;
