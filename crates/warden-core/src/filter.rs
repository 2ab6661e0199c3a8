//! Parsing of loosely-typed filter payloads into a [`FilterSpec`].
//!
//! Exactly one selection mode is active per request. When a payload could
//! satisfy several, the fixed precedence is ids, then type token, then
//! category, then region, then everything. Presence of every key is
//! decided with [`json::has_key`](crate::json::has_key) via
//! [`json::supplied`](crate::json::supplied), never by comparing a lookup
//! against `null`.

use std::collections::BTreeSet;

use serde_json::Value;
use warden_types::{Cell, CellRect, EntityId, ItemCategory};

use crate::error::ToolError;
use crate::json;

/// Largest rectangle, in cells, that a single call may expand (50x50).
pub const MAX_REGION_CELLS: u64 = 2500;

/// The parsed, unambiguous description of which entities a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// Exact id membership.
    ByIds(BTreeSet<EntityId>),
    /// A def name or label token.
    ByTypeToken(String),
    /// A fixed item category (never [`ItemCategory::All`]).
    ByCategory(ItemCategory),
    /// Every cell of an inclusive rectangle.
    ByRegion(CellRect),
    /// No criteria supplied.
    All,
}

impl FilterSpec {
    /// Classify a payload. Never fails: a payload without any recognized
    /// key, or a non-object payload, yields [`FilterSpec::All`].
    pub fn parse(payload: &Value) -> Self {
        if let Some(ids) = json::supplied(payload, "ids") {
            return Self::ByIds(json::int_list(ids).into_iter().map(EntityId).collect());
        }

        let token = json::supplied(payload, "type")
            .or_else(|| json::supplied(payload, "def_name"))
            .and_then(json::as_str);
        if let Some(token) = token {
            return Self::ByTypeToken(token.to_owned());
        }

        // `all` and unrecognized categories degrade to the region check.
        let category = json::supplied(payload, "category")
            .and_then(json::as_str)
            .and_then(ItemCategory::parse)
            .filter(|cat| *cat != ItemCategory::All);
        if let Some(category) = category {
            return Self::ByCategory(category);
        }

        parse_region(payload).map_or(Self::All, Self::ByRegion)
    }

    /// Bare name of the active mode: `ids`, `type`, `category`, `region`,
    /// or `all`.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ByIds(_) => "ids",
            Self::ByTypeToken(_) => "type",
            Self::ByCategory(_) => "category",
            Self::ByRegion(_) => "region",
            Self::All => "all",
        }
    }

    /// Reject specs that would expand into too much work before any
    /// resolution runs.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::RegionTooLarge`] when a region covers more than
    /// [`MAX_REGION_CELLS`] cells.
    pub fn validate(&self) -> Result<(), ToolError> {
        if let Self::ByRegion(rect) = self {
            let cells = rect.cell_count();
            if cells > MAX_REGION_CELLS {
                return Err(ToolError::RegionTooLarge {
                    cells,
                    max: MAX_REGION_CELLS,
                });
            }
        }
        Ok(())
    }
}

/// Read a rectangle from `x1,z1,x2,z2`, `x,z,x2,z2`, or a single cell from
/// `x,z`. A partial corner never activates the region filter.
fn parse_region(payload: &Value) -> Option<CellRect> {
    if let Some(a) = corner(payload, "x1", "z1")
        && let Some(b) = corner(payload, "x2", "z2")
    {
        return Some(CellRect::from_corners(a, b));
    }

    let origin = corner(payload, "x", "z")?;
    Some(corner(payload, "x2", "z2").map_or_else(
        || CellRect::single(origin),
        |far| CellRect::from_corners(origin, far),
    ))
}

/// A cell from two coordinate keys, when both are supplied.
fn corner(payload: &Value, x_key: &str, z_key: &str) -> Option<Cell> {
    let x = json::supplied(payload, x_key)?;
    let z = json::supplied(payload, z_key)?;
    Some(Cell::new(coordinate(x), coordinate(z)))
}

/// Coerce a coordinate node, clamping to the `i32` range.
fn coordinate(node: &Value) -> i32 {
    let raw = json::as_int(node);
    i32::try_from(raw).unwrap_or(if raw < 0 { i32::MIN } else { i32::MAX })
}
