//! In-memory reference implementation of [`EntityStore`].
//!
//! [`ThingMap`] keeps things in a `BTreeMap` keyed by id so enumeration is
//! deterministic, plus a per-cell index of spawned things for region
//! queries. It is `Clone` so the host can publish tick-stale snapshots.

use std::collections::BTreeMap;

use tracing::debug;
use warden_types::{Cell, CellRect, DefTrait, EntityId, Stockpile, Thing, ThingDef, ZoneId};

use crate::error::WorldError;
use crate::store::EntityStore;

/// A rectangular map holding things, defs, and stockpile zones.
#[derive(Debug, Clone)]
pub struct ThingMap {
    /// Map bounds.
    bounds: CellRect,
    /// All things indexed by id.
    things: BTreeMap<EntityId, Thing>,
    /// Spawned things per cell, in spawn order.
    grid: BTreeMap<Cell, Vec<EntityId>>,
    /// Registered defs by canonical name.
    defs: BTreeMap<String, ThingDef>,
    /// Stockpile zones in creation order.
    stockpiles: Vec<Stockpile>,
    /// Next id handed out by [`ThingMap::spawn`].
    next_id: i64,
    /// Next zone id.
    next_zone: i64,
}

impl ThingMap {
    /// Create an empty `width` x `height` map.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bounds: CellRect::of_size(width, height),
            things: BTreeMap::new(),
            grid: BTreeMap::new(),
            defs: BTreeMap::new(),
            stockpiles: Vec::new(),
            next_id: 1,
            next_zone: 1,
        }
    }

    /// Register (or replace) a def.
    pub fn register_def(&mut self, def: ThingDef) {
        self.defs.insert(def.def_name.clone(), def);
    }

    /// Spawn a new thing of a registered def and return its fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownDef`] if the def is not registered, or
    /// [`WorldError::OutOfBounds`] if `cell` lies outside the map.
    pub fn spawn(
        &mut self,
        def_name: &str,
        cell: Cell,
        stack_count: u32,
    ) -> Result<EntityId, WorldError> {
        let id = EntityId(self.next_id);
        self.insert(Thing {
            id,
            def_name: def_name.to_owned(),
            position: cell,
            stack_count: stack_count.max(1),
            spawned: true,
            forbidden: false,
        })?;
        Ok(id)
    }

    /// Insert a fully specified thing, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateEntity`] if the id is taken,
    /// [`WorldError::UnknownDef`] for unregistered defs, and
    /// [`WorldError::OutOfBounds`] for a spawned thing outside the map.
    pub fn insert(&mut self, thing: Thing) -> Result<(), WorldError> {
        if self.things.contains_key(&thing.id) {
            return Err(WorldError::DuplicateEntity(thing.id));
        }
        if !self.defs.contains_key(&thing.def_name) {
            return Err(WorldError::UnknownDef(thing.def_name));
        }
        if thing.spawned && !self.bounds.contains(thing.position) {
            return Err(WorldError::OutOfBounds {
                cell: thing.position,
            });
        }

        let id = thing.id;
        if thing.spawned {
            self.grid.entry(thing.position).or_default().push(id);
        }
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        debug!(entity = %id, def = %thing.def_name, cell = %thing.position, "thing inserted");
        self.things.insert(id, thing);
        Ok(())
    }

    /// Remove a thing from the map without forgetting it. The id stays
    /// known but the thing no longer counts as live.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotFound`] for unknown ids.
    pub fn despawn(&mut self, id: EntityId) -> Result<(), WorldError> {
        let thing = self
            .things
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        if thing.spawned {
            thing.spawned = false;
            if let Some(ids) = self.grid.get_mut(&thing.position) {
                ids.retain(|other| *other != id);
            }
        }
        Ok(())
    }

    /// Designate a stockpile zone covering `rect`.
    pub fn add_stockpile(&mut self, name: &str, rect: CellRect) -> ZoneId {
        let id = ZoneId(self.next_zone);
        self.next_zone = self.next_zone.saturating_add(1);
        self.stockpiles.push(Stockpile {
            id,
            name: name.to_owned(),
            rect,
        });
        id
    }

    /// Number of known things, spawned or not.
    pub fn thing_count(&self) -> usize {
        self.things.len()
    }

    /// Number of registered defs.
    pub fn def_count(&self) -> usize {
        self.defs.len()
    }
}

impl EntityStore for ThingMap {
    fn bounds(&self) -> CellRect {
        self.bounds
    }

    fn thing(&self, id: EntityId) -> Option<&Thing> {
        self.things.get(&id)
    }

    fn things(&self) -> Box<dyn Iterator<Item = &Thing> + '_> {
        Box::new(self.things.values())
    }

    fn things_at(&self, cell: Cell) -> &[EntityId] {
        self.grid.get(&cell).map_or(&[], Vec::as_slice)
    }

    fn def(&self, def_name: &str) -> Option<&ThingDef> {
        self.defs.get(def_name)
    }

    fn stockpile_at(&self, cell: Cell) -> Option<&Stockpile> {
        self.stockpiles.iter().find(|zone| zone.rect.contains(cell))
    }

    fn set_forbidden(&mut self, id: EntityId, forbidden: bool) -> Result<(), WorldError> {
        let thing = self
            .things
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        if !thing.spawned {
            return Err(WorldError::NotSpawned(id));
        }
        let forbiddable = self
            .defs
            .get(&thing.def_name)
            .is_some_and(|def| def.has(DefTrait::Forbiddable));
        if !forbiddable {
            return Err(WorldError::NotForbiddable(id));
        }
        thing.forbidden = forbidden;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use warden_types::ThingCategory;

    use super::*;

    fn steel() -> ThingDef {
        ThingDef::new("Steel", "steel", ThingCategory::Item)
            .with(DefTrait::Haulable)
            .with(DefTrait::Stuff)
            .with(DefTrait::Forbiddable)
    }

    fn wall() -> ThingDef {
        ThingDef::new("Wall", "wall", ThingCategory::Building)
    }

    #[test]
    fn spawn_indexes_by_cell() {
        let mut map = ThingMap::new(10, 10);
        map.register_def(steel());
        let a = map.spawn("Steel", Cell::new(3, 3), 20).unwrap();
        let b = map.spawn("Steel", Cell::new(3, 3), 5).unwrap();
        assert_ne!(a, b);
        assert_eq!(map.things_at(Cell::new(3, 3)), &[a, b]);
        assert!(map.things_at(Cell::new(4, 3)).is_empty());
    }

    #[test]
    fn spawn_rejects_unknown_def_and_out_of_bounds() {
        let mut map = ThingMap::new(10, 10);
        map.register_def(steel());
        assert!(matches!(
            map.spawn("Gold", Cell::new(1, 1), 1),
            Err(WorldError::UnknownDef(_))
        ));
        assert!(matches!(
            map.spawn("Steel", Cell::new(10, 0), 1),
            Err(WorldError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn insert_keeps_explicit_ids() {
        let mut map = ThingMap::new(10, 10);
        map.register_def(steel());
        let thing = Thing {
            id: EntityId(40),
            def_name: "Steel".to_owned(),
            position: Cell::new(0, 0),
            stack_count: 1,
            spawned: true,
            forbidden: true,
        };
        map.insert(thing.clone()).unwrap();
        assert!(matches!(map.insert(thing), Err(WorldError::DuplicateEntity(_))));
        let next = map.spawn("Steel", Cell::new(1, 1), 1).unwrap();
        assert_eq!(next, EntityId(41));
    }

    #[test]
    fn despawn_removes_from_cell_index() {
        let mut map = ThingMap::new(10, 10);
        map.register_def(steel());
        let id = map.spawn("Steel", Cell::new(2, 2), 1).unwrap();
        map.despawn(id).unwrap();
        assert!(map.things_at(Cell::new(2, 2)).is_empty());
        assert!(!map.thing(id).unwrap().spawned);
        assert!(matches!(
            map.set_forbidden(id, true),
            Err(WorldError::NotSpawned(_))
        ));
    }

    #[test]
    fn set_forbidden_requires_capability() {
        let mut map = ThingMap::new(10, 10);
        map.register_def(steel());
        map.register_def(wall());
        let steel_id = map.spawn("Steel", Cell::new(1, 1), 1).unwrap();
        let wall_id = map.spawn("Wall", Cell::new(2, 1), 1).unwrap();

        map.set_forbidden(steel_id, true).unwrap();
        assert!(map.thing(steel_id).unwrap().forbidden);
        assert!(matches!(
            map.set_forbidden(wall_id, true),
            Err(WorldError::NotForbiddable(_))
        ));
        assert!(matches!(
            map.set_forbidden(EntityId(999), true),
            Err(WorldError::EntityNotFound(_))
        ));
    }

    #[test]
    fn stockpile_lookup() {
        let mut map = ThingMap::new(10, 10);
        map.add_stockpile(
            "Stockpile zone 1",
            CellRect::from_corners(Cell::new(0, 0), Cell::new(2, 2)),
        );
        assert_eq!(
            map.stockpile_at(Cell::new(1, 1)).map(|zone| zone.name.as_str()),
            Some("Stockpile zone 1")
        );
        assert!(map.stockpile_at(Cell::new(3, 3)).is_none());
    }

    #[test]
    fn eligibility_and_labels() {
        let mut map = ThingMap::new(10, 10);
        map.register_def(steel());
        map.register_def(wall());
        let steel_id = map.spawn("Steel", Cell::new(1, 1), 75).unwrap();
        let wall_id = map.spawn("Wall", Cell::new(2, 1), 1).unwrap();
        let steel = map.thing(steel_id).unwrap();
        let wall = map.thing(wall_id).unwrap();
        assert!(map.is_eligible(steel));
        assert!(!map.is_eligible(wall));
        assert_eq!(map.label_of(steel), "steel x75");
    }
}
