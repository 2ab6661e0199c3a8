//! Core data structs: map geometry, thing definitions, live things, and the
//! outbound result shapes returned to the controller.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DefTrait, ThingCategory};
use crate::ids::{EntityId, ZoneId};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A single map cell. The map is a 2D grid on the `x` / `z` plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row.
    pub z: i32,
}

impl Cell {
    /// Create a cell from its coordinates.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.z)
    }
}

/// An inclusive, normalized rectangle of cells.
///
/// `min_x <= max_x` and `min_z <= max_z` always hold; construct through
/// [`CellRect::from_corners`] so corner order never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CellRect {
    /// Smallest column.
    pub min_x: i32,
    /// Smallest row.
    pub min_z: i32,
    /// Largest column.
    pub max_x: i32,
    /// Largest row.
    pub max_z: i32,
}

impl CellRect {
    /// Build a rectangle from two opposite corners in any order.
    pub fn from_corners(a: Cell, b: Cell) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_z: a.z.min(b.z),
            max_x: a.x.max(b.x),
            max_z: a.z.max(b.z),
        }
    }

    /// The degenerate rectangle covering exactly one cell.
    pub const fn single(cell: Cell) -> Self {
        Self {
            min_x: cell.x,
            min_z: cell.z,
            max_x: cell.x,
            max_z: cell.z,
        }
    }

    /// Rectangle covering a `width` x `height` map anchored at the origin.
    ///
    /// A zero dimension yields a rectangle whose max is below its min on
    /// that axis, which contains no cells.
    pub fn of_size(width: u32, height: u32) -> Self {
        let max_x = i32::try_from(width).unwrap_or(i32::MAX).saturating_sub(1);
        let max_z = i32::try_from(height).unwrap_or(i32::MAX).saturating_sub(1);
        Self {
            min_x: 0,
            min_z: 0,
            max_x,
            max_z,
        }
    }

    /// Whether this rectangle covers exactly one cell.
    pub const fn is_single(&self) -> bool {
        self.min_x == self.max_x && self.min_z == self.max_z
    }

    /// Number of columns covered (0 for an empty rectangle).
    pub fn width(&self) -> u64 {
        span(self.min_x, self.max_x)
    }

    /// Number of rows covered (0 for an empty rectangle).
    pub fn height(&self) -> u64 {
        span(self.min_z, self.max_z)
    }

    /// Total number of cells covered.
    pub fn cell_count(&self) -> u64 {
        self.width().saturating_mul(self.height())
    }

    /// Whether `cell` lies inside the rectangle.
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min_x && cell.x <= self.max_x && cell.z >= self.min_z && cell.z <= self.max_z
    }

    /// The overlap of two rectangles, or `None` when they are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let clipped = Self {
            min_x: self.min_x.max(other.min_x),
            min_z: self.min_z.max(other.min_z),
            max_x: self.max_x.min(other.max_x),
            max_z: self.max_z.min(other.max_z),
        };
        (clipped.min_x <= clipped.max_x && clipped.min_z <= clipped.max_z).then_some(clipped)
    }

    /// Iterate every cell, row by row (`z` outer, `x` inner).
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_z..=self.max_z).flat_map(move |z| (min_x..=max_x).map(move |x| Cell { x, z }))
    }

    /// The corner with the smallest coordinates.
    pub const fn min_corner(&self) -> Cell {
        Cell::new(self.min_x, self.min_z)
    }

    /// The corner with the largest coordinates.
    pub const fn max_corner(&self) -> Cell {
        Cell::new(self.max_x, self.max_z)
    }
}

impl fmt::Display for CellRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_corner(), self.max_corner())
    }
}

/// Inclusive length of `min..=max`, or 0 when `max < min`.
fn span(min: i32, max: i32) -> u64 {
    let len = i64::from(max)
        .saturating_sub(i64::from(min))
        .saturating_add(1);
    u64::try_from(len).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Definitions and live things
// ---------------------------------------------------------------------------

/// Static definition of a kind of thing (what the game calls a "def").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingDef {
    /// Canonical, unique name (e.g. `MeleeWeapon_LongSword`).
    pub def_name: String,
    /// Human-readable display label (e.g. `longsword`).
    pub label: String,
    /// Broad kind of entity this def produces.
    pub category: ThingCategory,
    /// Trait flags.
    #[serde(default)]
    pub traits: BTreeSet<DefTrait>,
}

impl ThingDef {
    /// Create a definition with no trait flags.
    pub fn new(def_name: &str, label: &str, category: ThingCategory) -> Self {
        Self {
            def_name: def_name.to_owned(),
            label: label.to_owned(),
            category,
            traits: BTreeSet::new(),
        }
    }

    /// Builder-style helper adding a trait flag.
    #[must_use]
    pub fn with(mut self, flag: DefTrait) -> Self {
        self.traits.insert(flag);
        self
    }

    /// Whether the definition carries `flag`.
    pub fn has(&self, flag: DefTrait) -> bool {
        self.traits.contains(&flag)
    }

    /// Whether things of this def are haulable items.
    pub fn is_haulable_item(&self) -> bool {
        self.category == ThingCategory::Item && self.has(DefTrait::Haulable)
    }
}

/// A live thing in the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    /// Stable identifier.
    pub id: EntityId,
    /// Name of the [`ThingDef`] this thing was made from.
    pub def_name: String,
    /// Current position.
    pub position: Cell,
    /// Number of units in this stack (1 for non-stackables).
    pub stack_count: u32,
    /// Whether the thing is currently spawned on the map.
    pub spawned: bool,
    /// Forbidden flag; only meaningful for forbiddable defs.
    pub forbidden: bool,
}

impl Thing {
    /// Format the thing's label with a stack suffix when it holds more
    /// than one unit, e.g. `steel x75`.
    pub fn stack_label(&self, label: &str) -> String {
        if self.stack_count > 1 {
            format!("{label} x{}", self.stack_count)
        } else {
            label.to_owned()
        }
    }
}

/// A stockpile zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stockpile {
    /// Zone identifier.
    pub id: ZoneId,
    /// Display name, e.g. `Stockpile zone 1`.
    pub name: String,
    /// Cells covered by the zone.
    pub rect: CellRect,
}

// ---------------------------------------------------------------------------
// Outcomes and outbound results
// ---------------------------------------------------------------------------

/// Tally produced by applying a mutation to a resolved target set.
///
/// `total_matched == changed + already_correct + not_applicable` always
/// holds, and `examples` never holds more than 20 labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MutationOutcome {
    /// Targets whose state was changed.
    pub changed: u32,
    /// Targets already in the desired state.
    pub already_correct: u32,
    /// Targets lacking the mutation capability, or whose mutation failed.
    pub not_applicable: u32,
    /// Every target seen.
    pub total_matched: u32,
    /// Labels of the first changed targets.
    pub examples: Vec<String>,
}

/// Outbound result of a mutating tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MutationReport {
    /// Which targeting branch fired, with its literal criteria.
    pub targeting_mode: String,
    /// Targets whose state was changed.
    pub changed: u32,
    /// Targets already in the desired state.
    pub already_correct: u32,
    /// Every target seen.
    pub total_matched: u32,
    /// Targets that do not support the toggle; omitted when zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub not_forbiddable: Option<u32>,
    /// Labels of changed targets; omitted when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub examples: Option<Vec<String>>,
}

impl MutationReport {
    /// Shape a [`MutationOutcome`] into the outbound report.
    pub fn from_outcome(targeting_mode: String, outcome: MutationOutcome) -> Self {
        Self {
            targeting_mode,
            changed: outcome.changed,
            already_correct: outcome.already_correct,
            total_matched: outcome.total_matched,
            not_forbiddable: (outcome.not_applicable > 0).then_some(outcome.not_applicable),
            examples: (!outcome.examples.is_empty()).then_some(outcome.examples),
        }
    }
}

/// One row of a read tool's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ItemRecord {
    /// Stable identifier.
    pub id: EntityId,
    /// Label with stack suffix.
    pub name: String,
    /// Canonical def name.
    pub def: String,
    /// Column.
    pub x: i32,
    /// Row.
    pub z: i32,
    /// Name of the stockpile the item stands in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stockpile: Option<String>,
}

/// Outbound result of a read tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ItemListing {
    /// Number of items returned.
    pub count: u32,
    /// The items.
    pub items: Vec<ItemRecord>,
}

impl ItemListing {
    /// Build a listing, deriving `count` from the rows.
    pub fn new(items: Vec<ItemRecord>) -> Self {
        Self {
            count: u32::try_from(items.len()).unwrap_or(u32::MAX),
            items,
        }
    }
}
