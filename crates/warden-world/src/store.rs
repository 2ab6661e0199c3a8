//! The [`EntityStore`] trait: the read and write accessors the simulation
//! host exposes to the resolver and the mutation applier.
//!
//! The store is owned by the simulation and only ever touched from the
//! simulation thread. Nothing in this trait requires `Sync`; callers on
//! other threads reach it through the dispatch queue.

use warden_types::{Cell, CellRect, EntityId, Stockpile, Thing, ThingDef};

use crate::error::WorldError;

/// Enumerable collection of live entities with spatial and def lookup.
pub trait EntityStore {
    /// The map bounds. Every spawned thing lies inside this rectangle.
    fn bounds(&self) -> CellRect;

    /// Look up a thing by id, spawned or not.
    fn thing(&self, id: EntityId) -> Option<&Thing>;

    /// Iterate every known thing in ascending id order.
    fn things(&self) -> Box<dyn Iterator<Item = &Thing> + '_>;

    /// Ids of the spawned things standing in `cell`. Out-of-bounds cells
    /// yield an empty slice.
    fn things_at(&self, cell: Cell) -> &[EntityId];

    /// Look up a def by its canonical name (exact, case-sensitive).
    fn def(&self, def_name: &str) -> Option<&ThingDef>;

    /// The stockpile covering `cell`, if any.
    fn stockpile_at(&self, cell: Cell) -> Option<&Stockpile>;

    /// Set the forbidden flag of a thing.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotFound`] for unknown ids,
    /// [`WorldError::NotSpawned`] for despawned things, and
    /// [`WorldError::NotForbiddable`] when the def lacks the capability.
    fn set_forbidden(&mut self, id: EntityId, forbidden: bool) -> Result<(), WorldError>;

    /// The def a thing was made from.
    fn def_of(&self, thing: &Thing) -> Option<&ThingDef> {
        self.def(&thing.def_name)
    }

    /// Whether the thing is a spawned, haulable item: the precondition for
    /// every item-targeting tool.
    fn is_eligible(&self, thing: &Thing) -> bool {
        thing.spawned && self.def_of(thing).is_some_and(ThingDef::is_haulable_item)
    }

    /// Display label with stack suffix, falling back to the def name when
    /// the def is unknown.
    fn label_of(&self, thing: &Thing) -> String {
        let label = self
            .def_of(thing)
            .map_or(thing.def_name.as_str(), |def| def.label.as_str());
        thing.stack_label(label)
    }
}
