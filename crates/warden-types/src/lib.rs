//! Shared type definitions for the Warden tool-call engine.
//!
//! This crate is the single source of truth for the data model exchanged
//! between the simulation host, the target resolver, and the external
//! controller. Outbound result types derive `ts-rs` so controller front-ends
//! receive matching `TypeScript` bindings.
//!
//! # Modules
//!
//! - [`ids`] -- Integer id newtypes for entities and zones
//! - [`enums`] -- Thing categories, def traits, filter enumerations
//! - [`structs`] -- Cells, rectangles, defs, things, and result shapes

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{DefTrait, ItemCategory, LocationFilter, ThingCategory};
pub use ids::{EntityId, ZoneId};
pub use structs::{
    Cell, CellRect, ItemListing, ItemRecord, MutationOutcome, MutationReport, Stockpile, Thing,
    ThingDef,
};
