//! Enumeration types shared across the Warden workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Thing categories
// ---------------------------------------------------------------------------

/// The broad kind of a simulation entity.
///
/// Only [`ThingCategory::Item`] entities are ever eligible for the item
/// tools; buildings and pawns can still be selected explicitly by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ThingCategory {
    /// A loose, carriable object lying on the map.
    Item,
    /// A constructed building or blueprint.
    Building,
    /// A creature (colonist, animal, raider).
    Pawn,
    /// A plant growing in the ground.
    Plant,
}

/// A trait flag carried by a thing definition.
///
/// Definitions hold a set of these instead of one boolean per trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DefTrait {
    /// Usable as medicine.
    Medicine,
    /// A dead body.
    Corpse,
    /// A ranged or melee weapon.
    Weapon,
    /// Wearable clothing or armour.
    Apparel,
    /// Gives nutrition when ingested.
    Nutrition,
    /// A raw material ("stuff") that buildings and items are made from.
    Stuff,
    /// Can ever be hauled by a colonist.
    Haulable,
    /// Supports the allowed / forbidden toggle.
    Forbiddable,
}

// ---------------------------------------------------------------------------
// Filter enumerations
// ---------------------------------------------------------------------------

/// Item category accepted by the `category` filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ItemCategory {
    /// Medicine of any quality.
    Medicine,
    /// Corpses of any kind.
    Corpses,
    /// Weapons that are plain items and not apparel.
    Weapons,
    /// Apparel lying around as items.
    Apparel,
    /// Anything that gives nutrition.
    Food,
    /// Raw materials.
    Resources,
    /// No category restriction.
    All,
}

impl ItemCategory {
    /// Parse a category name, case-insensitively and ignoring surrounding
    /// whitespace. Returns `None` for unrecognized names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "medicine" => Some(Self::Medicine),
            "corpses" | "corpse" => Some(Self::Corpses),
            "weapons" | "weapon" => Some(Self::Weapons),
            "apparel" => Some(Self::Apparel),
            "food" => Some(Self::Food),
            "resources" | "resource" => Some(Self::Resources),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// The canonical lowercase name, as used in targeting mode tags.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Medicine => "medicine",
            Self::Corpses => "corpses",
            Self::Weapons => "weapons",
            Self::Apparel => "apparel",
            Self::Food => "food",
            Self::Resources => "resources",
            Self::All => "all",
        }
    }
}

/// Restricts resolved targets by whether they lie inside a stockpile zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LocationFilter {
    /// Keep every target.
    #[default]
    All,
    /// Keep only targets standing in a stockpile.
    Stockpile,
    /// Keep only targets outside any stockpile.
    Ground,
}

impl LocationFilter {
    /// Parse a location filter name. Unrecognized names fall back to
    /// [`LocationFilter::All`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stockpile" => Self::Stockpile,
            "ground" => Self::Ground,
            _ => Self::All,
        }
    }

    /// Whether a target with the given stockpile membership is kept.
    pub const fn keeps(self, in_stockpile: bool) -> bool {
        match self {
            Self::All => true,
            Self::Stockpile => in_stockpile,
            Self::Ground => !in_stockpile,
        }
    }
}
