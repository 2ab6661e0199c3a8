//! Target resolution: turning a [`FilterSpec`] into a concrete,
//! deduplicated list of live entity ids.
//!
//! Precedence is fixed and evaluated top to bottom, first match wins:
//!
//! 1. **ids** -- exact membership; only spawned entities are returned.
//! 2. **type** -- exact def name first, all spawned things of that def;
//!    otherwise a case-insensitive substring match against def name or
//!    label, restricted to eligible (haulable item) things.
//! 3. **category** -- fixed predicate per [`ItemCategory`].
//! 4. **region** -- every eligible thing in the rectangle, clipped to the
//!    map; out-of-bounds cells are skipped.
//! 5. **all** -- every eligible thing.
//!
//! The returned [`TargetingMode`] names the branch that fired together
//! with its literal criteria. Its `Display` form is the `targeting_mode`
//! field of the controller-facing result.

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;
use warden_types::{
    CellRect, DefTrait, EntityId, ItemCategory, LocationFilter, ThingCategory, ThingDef,
};
use warden_world::EntityStore;

use crate::filter::FilterSpec;

/// Most alternatives listed in a resolution miss.
pub const MAX_ALTERNATIVES: usize = 10;

/// Which resolution branch fired, with its literal criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetingMode {
    /// Explicit id list with the number of ids requested.
    Ids {
        /// Distinct ids in the request.
        requested: usize,
    },
    /// Exact def-name match.
    TypeExact {
        /// The matched def.
        def_name: String,
    },
    /// Substring fallback on def name or label.
    TypeFuzzy {
        /// The token as supplied.
        token: String,
    },
    /// Category predicate.
    Category(ItemCategory),
    /// Rectangle (or single cell) as requested, before clipping.
    Region(CellRect),
    /// No criteria.
    All,
}

impl TargetingMode {
    /// Bare branch name: `ids`, `type`, `category`, `region`, or `all`.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ids { .. } => "ids",
            Self::TypeExact { .. } | Self::TypeFuzzy { .. } => "type",
            Self::Category(_) => "category",
            Self::Region(_) => "region",
            Self::All => "all",
        }
    }
}

impl fmt::Display for TargetingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ids { requested } => write!(f, "ids:{requested}"),
            Self::TypeExact { def_name } => write!(f, "type:{def_name}"),
            Self::TypeFuzzy { token } => write!(f, "type~{token}"),
            Self::Category(cat) => write!(f, "category:{}", cat.as_str()),
            Self::Region(rect) if rect.is_single() => write!(f, "cell:{}", rect.min_corner()),
            Self::Region(rect) => write!(f, "region:{rect}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// The resolved target set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Matching ids, deduplicated, in deterministic order.
    pub targets: Vec<EntityId>,
    /// The branch that produced them.
    pub mode: TargetingMode,
}

/// A filter that names something the store does not have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No def or eligible thing matches the type token.
    #[error("No items matching '{query}' found. Available: {}", .available.join(", "))]
    NotFound {
        /// The token as supplied.
        query: String,
        /// Up to [`MAX_ALTERNATIVES`] def names the caller could use instead.
        available: Vec<String>,
    },

    /// The requested rectangle does not overlap the map at all.
    #[error("Area {rect} is outside the map bounds {bounds}.")]
    OutOfBounds {
        /// The requested rectangle.
        rect: CellRect,
        /// The map bounds.
        bounds: CellRect,
    },
}

/// Resolve `spec` against a store.
///
/// Zero matches is a successful, empty resolution.
///
/// # Errors
///
/// Returns [`ResolveError::NotFound`] when a type token matches nothing at
/// all, and [`ResolveError::OutOfBounds`] when a region lies entirely
/// outside the map.
pub fn resolve<S: EntityStore + ?Sized>(
    spec: &FilterSpec,
    store: &S,
) -> Result<Resolution, ResolveError> {
    let resolution = match spec {
        FilterSpec::ByIds(ids) => Resolution {
            targets: by_ids(ids, store),
            mode: TargetingMode::Ids {
                requested: ids.len(),
            },
        },
        FilterSpec::ByTypeToken(token) => by_type(token, store)?,
        FilterSpec::ByCategory(category) => Resolution {
            targets: store
                .things()
                .filter(|thing| thing.spawned)
                .filter(|thing| {
                    store
                        .def_of(thing)
                        .is_some_and(|def| category_matches(*category, def))
                })
                .map(|thing| thing.id)
                .collect(),
            mode: TargetingMode::Category(*category),
        },
        FilterSpec::ByRegion(rect) => Resolution {
            targets: by_region(rect, store)?,
            mode: TargetingMode::Region(*rect),
        },
        FilterSpec::All => Resolution {
            targets: store
                .things()
                .filter(|thing| store.is_eligible(thing))
                .map(|thing| thing.id)
                .collect(),
            mode: TargetingMode::All,
        },
    };

    debug!(
        mode = %resolution.mode,
        matched = resolution.targets.len(),
        "targets resolved"
    );
    Ok(resolution)
}

/// Keep only targets whose stockpile membership passes `filter`.
pub fn apply_location_filter<S: EntityStore + ?Sized>(
    targets: Vec<EntityId>,
    store: &S,
    filter: LocationFilter,
) -> Vec<EntityId> {
    if filter == LocationFilter::All {
        return targets;
    }
    targets
        .into_iter()
        .filter(|id| {
            store.thing(*id).is_some_and(|thing| {
                filter.keeps(store.stockpile_at(thing.position).is_some())
            })
        })
        .collect()
}

fn by_ids<S: EntityStore + ?Sized>(ids: &BTreeSet<EntityId>, store: &S) -> Vec<EntityId> {
    ids.iter()
        .filter(|id| store.thing(**id).is_some_and(|thing| thing.spawned))
        .copied()
        .collect()
}

fn by_type<S: EntityStore + ?Sized>(token: &str, store: &S) -> Result<Resolution, ResolveError> {
    if let Some(def) = store.def(token) {
        let targets = store
            .things()
            .filter(|thing| thing.spawned && thing.def_name == def.def_name)
            .map(|thing| thing.id)
            .collect();
        return Ok(Resolution {
            targets,
            mode: TargetingMode::TypeExact {
                def_name: def.def_name.clone(),
            },
        });
    }

    let needle = token.to_lowercase();
    let targets: Vec<EntityId> = store
        .things()
        .filter(|thing| store.is_eligible(thing))
        .filter(|thing| {
            thing.def_name.to_lowercase().contains(&needle)
                || store
                    .def_of(thing)
                    .is_some_and(|def| def.label.to_lowercase().contains(&needle))
        })
        .map(|thing| thing.id)
        .collect();

    if targets.is_empty() {
        let available: BTreeSet<&str> = store
            .things()
            .filter(|thing| store.is_eligible(thing))
            .map(|thing| thing.def_name.as_str())
            .collect();
        return Err(ResolveError::NotFound {
            query: token.to_owned(),
            available: available
                .into_iter()
                .take(MAX_ALTERNATIVES)
                .map(str::to_owned)
                .collect(),
        });
    }

    Ok(Resolution {
        targets,
        mode: TargetingMode::TypeFuzzy {
            token: token.to_owned(),
        },
    })
}

fn by_region<S: EntityStore + ?Sized>(
    rect: &CellRect,
    store: &S,
) -> Result<Vec<EntityId>, ResolveError> {
    let bounds = store.bounds();
    let clipped = rect
        .intersect(&bounds)
        .ok_or(ResolveError::OutOfBounds {
            rect: *rect,
            bounds,
        })?;

    let mut seen = BTreeSet::new();
    let mut targets = Vec::new();
    for cell in clipped.cells() {
        for id in store.things_at(cell) {
            let eligible = store
                .thing(*id)
                .is_some_and(|thing| store.is_eligible(thing));
            if eligible && seen.insert(*id) {
                targets.push(*id);
            }
        }
    }
    Ok(targets)
}

/// The fixed category-to-predicate mapping.
fn category_matches(category: ItemCategory, def: &ThingDef) -> bool {
    let plain_item = def.category == ThingCategory::Item;
    match category {
        ItemCategory::Medicine => def.has(DefTrait::Medicine),
        ItemCategory::Corpses => def.has(DefTrait::Corpse),
        ItemCategory::Weapons => plain_item && def.has(DefTrait::Weapon) && !def.has(DefTrait::Apparel),
        ItemCategory::Apparel => plain_item && def.has(DefTrait::Apparel),
        ItemCategory::Food => plain_item && def.has(DefTrait::Nutrition),
        ItemCategory::Resources => plain_item && def.has(DefTrait::Stuff),
        ItemCategory::All => def.is_haulable_item(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use warden_types::{Cell, Thing};
    use warden_world::ThingMap;

    use super::*;

    fn item(def_name: &str, label: &str, flags: &[DefTrait]) -> ThingDef {
        flags.iter().fold(
            ThingDef::new(def_name, label, ThingCategory::Item)
                .with(DefTrait::Haulable)
                .with(DefTrait::Forbiddable),
            |def, flag| def.with(*flag),
        )
    }

    /// 20x20 map: steel at (2,2) and (5,5), a sword at (3,3), a shirt at
    /// (4,4), a meal in the stockpile at (0,0), a wall at (2,3), and a
    /// despawned steel stack.
    fn fixture() -> (ThingMap, Vec<EntityId>) {
        let mut map = ThingMap::new(20, 20);
        map.register_def(item("Steel", "steel", &[DefTrait::Stuff]));
        map.register_def(item("MeleeWeapon_LongSword", "longsword", &[DefTrait::Weapon]));
        map.register_def(item("Apparel_BasicShirt", "button-down shirt", &[DefTrait::Apparel]));
        map.register_def(item("MealSimple", "simple meal", &[DefTrait::Nutrition]));
        map.register_def(ThingDef::new("Wall", "wall", ThingCategory::Building));
        map.add_stockpile("Stockpile zone 1", CellRect::from_corners(Cell::new(0, 0), Cell::new(1, 1)));

        let ids = vec![
            map.spawn("Steel", Cell::new(2, 2), 50).unwrap(),
            map.spawn("Steel", Cell::new(5, 5), 10).unwrap(),
            map.spawn("MeleeWeapon_LongSword", Cell::new(3, 3), 1).unwrap(),
            map.spawn("Apparel_BasicShirt", Cell::new(4, 4), 1).unwrap(),
            map.spawn("MealSimple", Cell::new(0, 0), 4).unwrap(),
            map.spawn("Wall", Cell::new(2, 3), 1).unwrap(),
        ];
        map.insert(Thing {
            id: EntityId(100),
            def_name: "Steel".to_owned(),
            position: Cell::new(6, 6),
            stack_count: 1,
            spawned: false,
            forbidden: false,
        })
        .unwrap();
        (map, ids)
    }

    #[test]
    fn ids_beat_type_and_skip_unspawned() {
        let (map, ids) = fixture();
        let wall = ids[5];
        let spec = FilterSpec::parse(&json!({
            "ids": [wall.0, 100, 999],
            "type": "Steel",
        }));
        let resolution = resolve(&spec, &map).unwrap();
        assert_eq!(resolution.mode.kind(), "ids");
        assert_eq!(resolution.mode.to_string(), "ids:3");
        // Explicit ids may select non-items; despawned and unknown ids drop out.
        assert_eq!(resolution.targets, vec![wall]);
    }

    #[test]
    fn exact_type_returns_every_spawned_thing_of_the_def() {
        let (map, ids) = fixture();
        let resolution = resolve(&FilterSpec::ByTypeToken("Steel".to_owned()), &map).unwrap();
        assert_eq!(resolution.mode.to_string(), "type:Steel");
        assert_eq!(resolution.targets, vec![ids[0], ids[1]]);
    }

    #[test]
    fn fuzzy_type_matches_label_case_insensitively() {
        let (map, ids) = fixture();
        let resolution = resolve(&FilterSpec::ByTypeToken("SHIRT".to_owned()), &map).unwrap();
        assert_eq!(resolution.mode.to_string(), "type~SHIRT");
        assert_eq!(resolution.targets, vec![ids[3]]);

        let resolution = resolve(&FilterSpec::ByTypeToken("sword".to_owned()), &map).unwrap();
        assert_eq!(resolution.targets, vec![ids[2]]);
    }

    #[test]
    fn fuzzy_type_ignores_ineligible_things() {
        let (map, _) = fixture();
        // "wal" only matches the wall building, which is not an eligible item.
        let err = resolve(&FilterSpec::ByTypeToken("wal".to_owned()), &map).unwrap_err();
        match err {
            ResolveError::NotFound { query, available } => {
                assert_eq!(query, "wal");
                assert!(available.contains(&"Steel".to_owned()));
                assert!(!available.contains(&"Wall".to_owned()));
                assert!(available.len() <= MAX_ALTERNATIVES);
            }
            ResolveError::OutOfBounds { .. } => panic!("expected NotFound"),
        }
    }

    #[test]
    fn category_weapons_excludes_apparel() {
        let (map, ids) = fixture();
        let resolution = resolve(&FilterSpec::ByCategory(ItemCategory::Weapons), &map).unwrap();
        assert_eq!(resolution.mode.to_string(), "category:weapons");
        assert_eq!(resolution.targets, vec![ids[2]]);

        let resolution = resolve(&FilterSpec::ByCategory(ItemCategory::Resources), &map).unwrap();
        assert_eq!(resolution.targets, vec![ids[0], ids[1]]);
    }

    #[test]
    fn region_is_corner_order_independent() {
        let (map, _) = fixture();
        let forward = FilterSpec::parse(&json!({"x1": 2, "z1": 2, "x2": 5, "z2": 5}));
        let backward = FilterSpec::parse(&json!({"x1": 5, "z1": 5, "x2": 2, "z2": 2}));
        let a = resolve(&forward, &map).unwrap();
        let b = resolve(&backward, &map).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mode.to_string(), "region:(2,2)-(5,5)");
        // Steel x2, sword, shirt; the wall at (2,3) is not eligible.
        assert_eq!(a.targets.len(), 4);
    }

    #[test]
    fn region_clips_out_of_bounds_cells() {
        let (map, ids) = fixture();
        let spec = FilterSpec::parse(&json!({"x1": -10, "z1": -10, "x2": 0, "z2": 0}));
        let resolution = resolve(&spec, &map).unwrap();
        assert_eq!(resolution.targets, vec![ids[4]]);
    }

    #[test]
    fn region_fully_outside_the_map_is_an_error() {
        let (map, _) = fixture();
        let spec = FilterSpec::parse(&json!({"x": 40, "z": 40}));
        assert!(matches!(
            resolve(&spec, &map),
            Err(ResolveError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn single_cell_mode_tag() {
        let (map, ids) = fixture();
        let spec = FilterSpec::parse(&json!({"x": 3, "z": 3}));
        let resolution = resolve(&spec, &map).unwrap();
        assert_eq!(resolution.mode.to_string(), "cell:(3,3)");
        assert_eq!(resolution.mode.kind(), "region");
        assert_eq!(resolution.targets, vec![ids[2]]);
    }

    #[test]
    fn all_returns_every_eligible_live_thing() {
        let (map, ids) = fixture();
        let resolution = resolve(&FilterSpec::parse(&json!({})), &map).unwrap();
        assert_eq!(resolution.mode.to_string(), "all");
        assert_eq!(resolution.targets, ids[..5].to_vec());
    }

    #[test]
    fn location_filter_splits_stockpile_and_ground() {
        let (map, ids) = fixture();
        let all = resolve(&FilterSpec::All, &map).unwrap().targets;
        let stockpiled = apply_location_filter(all.clone(), &map, LocationFilter::Stockpile);
        assert_eq!(stockpiled, vec![ids[4]]);
        let ground = apply_location_filter(all, &map, LocationFilter::Ground);
        assert_eq!(ground.len(), 4);
    }
}
