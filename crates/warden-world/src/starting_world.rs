//! Default starting map used by the engine binary and by tests.
//!
//! Registers a small def catalogue covering every item category (medicine,
//! weapons, apparel, food, raw materials, corpses) plus a wall building,
//! designates one stockpile in the map corner, and scatters items with a
//! seeded RNG so runs are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use warden_types::{Cell, CellRect, DefTrait, ThingCategory, ThingDef};

use crate::error::WorldError;
use crate::store::EntityStore;
use crate::thing_map::ThingMap;

/// Parameters for [`create_starting_world`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartingWorldSpec {
    /// Map width in cells.
    pub width: u32,
    /// Map height in cells.
    pub height: u32,
    /// RNG seed for item placement.
    pub seed: u64,
    /// Number of scattered items.
    pub item_count: u32,
}

impl Default for StartingWorldSpec {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            seed: 42,
            item_count: 60,
        }
    }
}

/// Helper to build a haulable, forbiddable item def.
fn item(def_name: &str, label: &str, traits: &[DefTrait]) -> ThingDef {
    traits.iter().fold(
        ThingDef::new(def_name, label, ThingCategory::Item)
            .with(DefTrait::Haulable)
            .with(DefTrait::Forbiddable),
        |def, flag| def.with(*flag),
    )
}

/// The standard def catalogue.
pub fn standard_defs() -> Vec<ThingDef> {
    vec![
        item("MedicineHerbal", "herbal medicine", &[DefTrait::Medicine]),
        item("MedicineIndustrial", "medicine", &[DefTrait::Medicine]),
        item("Gun_Revolver", "revolver", &[DefTrait::Weapon]),
        item("MeleeWeapon_LongSword", "longsword", &[DefTrait::Weapon]),
        item("Apparel_BasicShirt", "button-down shirt", &[DefTrait::Apparel]),
        item("Apparel_FlakVest", "flak vest", &[DefTrait::Apparel]),
        item("MealSimple", "simple meal", &[DefTrait::Nutrition]),
        item("RawPotatoes", "potatoes", &[DefTrait::Nutrition]),
        item("Steel", "steel", &[DefTrait::Stuff]),
        item("WoodLog", "wood", &[DefTrait::Stuff]),
        item("Corpse_Human", "human corpse", &[DefTrait::Corpse]),
        // Chunks are haulable but cannot be forbidden in this catalogue.
        ThingDef::new("ChunkGranite", "granite chunk", ThingCategory::Item)
            .with(DefTrait::Haulable),
        ThingDef::new("Wall", "wall", ThingCategory::Building).with(DefTrait::Forbiddable),
    ]
}

/// Build the starting map.
///
/// # Errors
///
/// Returns [`WorldError`] if an item cannot be placed, which only happens
/// for a zero-sized map.
pub fn create_starting_world(spec: &StartingWorldSpec) -> Result<ThingMap, WorldError> {
    let mut map = ThingMap::new(spec.width, spec.height);
    let defs = standard_defs();
    let scatterable: Vec<String> = defs
        .iter()
        .filter(|def| def.is_haulable_item())
        .map(|def| def.def_name.clone())
        .collect();
    for def in defs {
        map.register_def(def);
    }

    let stockpile_max = Cell::new(
        i32::try_from(spec.width.min(10)).unwrap_or(10).saturating_sub(1),
        i32::try_from(spec.height.min(10)).unwrap_or(10).saturating_sub(1),
    );
    map.add_stockpile(
        "Stockpile zone 1",
        CellRect::from_corners(Cell::new(0, 0), stockpile_max),
    );

    let max_x = i32::try_from(spec.width).unwrap_or(i32::MAX);
    let max_z = i32::try_from(spec.height).unwrap_or(i32::MAX);
    if max_x == 0 || max_z == 0 {
        return Err(WorldError::OutOfBounds {
            cell: Cell::new(0, 0),
        });
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    for _ in 0..spec.item_count {
        let idx = rng.random_range(0..scatterable.len());
        let Some(def_name) = scatterable.get(idx) else {
            continue;
        };
        let cell = Cell::new(rng.random_range(0..max_x), rng.random_range(0..max_z));
        let stack: u32 = rng.random_range(1..=75);
        let id = map.spawn(def_name, cell, stack)?;
        // Roughly a quarter of the items start forbidden.
        let forbiddable = map
            .def(def_name)
            .is_some_and(|def| def.has(DefTrait::Forbiddable));
        if rng.random_range(0..4) == 0 && forbiddable {
            map.set_forbidden(id, true)?;
        }
    }

    info!(
        width = spec.width,
        height = spec.height,
        things = map.thing_count(),
        defs = map.def_count(),
        "Starting world created"
    );
    Ok(map)
}
