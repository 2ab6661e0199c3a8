//! The tool registry: validating a `{action, args}` request and executing
//! it against an [`EntityStore`].
//!
//! Validation ([`PreparedCall::prepare`]) is pure and runs on the caller's
//! thread. Execution needs the store and therefore runs on the simulation
//! thread, inside a dispatch task, unless a read is served from a
//! snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use warden_types::{EntityId, ItemListing, ItemRecord, LocationFilter, MutationReport};
use warden_world::EntityStore;

use crate::error::ToolError;
use crate::filter::FilterSpec;
use crate::json;
use crate::mutation::{self, AllowedMutation, Mutation};
use crate::resolver::{self, Resolution};

/// A tool call as received from the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Registered action name.
    pub action: String,
    /// Loosely typed arguments.
    #[serde(default)]
    pub args: Value,
}

impl ToolRequest {
    /// Build a request from parts.
    pub fn new(action: &str, args: Value) -> Self {
        Self {
            action: action.to_owned(),
            args,
        }
    }
}

/// Every registered tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Allow or forbid the resolved items.
    SetItemAllowed,
    /// List the resolved items that are currently forbidden.
    GetForbiddenItems,
    /// List every resolved item.
    ListItems,
}

impl ToolKind {
    /// All tools, in registry order.
    pub const ALL: [Self; 3] = [Self::SetItemAllowed, Self::GetForbiddenItems, Self::ListItems];

    /// Look up a tool by its action name.
    pub fn from_action(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == action)
    }

    /// The action name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SetItemAllowed => "set_item_allowed",
            Self::GetForbiddenItems => "get_forbidden_items",
            Self::ListItems => "list_items",
        }
    }

    /// Whether the tool leaves the store untouched.
    pub const fn is_read_only(self) -> bool {
        !matches!(self, Self::SetItemAllowed)
    }

    /// One-line usage summary.
    pub const fn description(self) -> &'static str {
        match self {
            Self::SetItemAllowed => {
                "Allow or forbid items. Target with ids, type, category, x/z or x1/z1/x2/z2; \
                 'allowed' is required."
            }
            Self::GetForbiddenItems => "List forbidden items, optionally narrowed by the same filters.",
            Self::ListItems => "List items matching the filters, with position and stockpile.",
        }
    }
}

/// A validated request: every argument has been parsed and checked, and
/// the call is ready to run against a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    kind: ToolKind,
    filter: FilterSpec,
    location: LocationFilter,
    allowed: bool,
}

impl PreparedCall {
    /// Validate a request without touching any store.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for unregistered actions,
    /// [`ToolError::Validation`] when `set_item_allowed` lacks `allowed`,
    /// and [`ToolError::RegionTooLarge`] for oversized rectangles.
    pub fn prepare(request: &ToolRequest) -> Result<Self, ToolError> {
        let kind = ToolKind::from_action(request.action.trim())
            .ok_or_else(|| ToolError::UnknownTool(request.action.clone()))?;
        let args = &request.args;

        let allowed = if kind == ToolKind::SetItemAllowed {
            json::supplied(args, "allowed")
                .map(json::as_bool)
                .ok_or_else(|| ToolError::Validation("Missing required parameter: allowed".to_owned()))?
        } else {
            false
        };

        let filter = FilterSpec::parse(args);
        filter.validate()?;

        let location = json::supplied(args, "location_filter")
            .and_then(json::as_str)
            .map_or(LocationFilter::All, LocationFilter::parse);

        Ok(Self {
            kind,
            filter,
            location,
            allowed,
        })
    }

    /// The tool this call runs.
    pub const fn kind(&self) -> ToolKind {
        self.kind
    }

    /// The parsed filter.
    pub const fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// Run the call against a live store.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Resolve`] on a resolution miss.
    pub fn execute(&self, store: &mut dyn EntityStore) -> Result<Value, ToolError> {
        match self.kind {
            ToolKind::SetItemAllowed => self.set_item_allowed(store),
            ToolKind::GetForbiddenItems | ToolKind::ListItems => self.execute_read(store),
        }
    }

    /// Run a read-only call against a store it cannot modify.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Resolve`] on a resolution miss, and
    /// [`ToolError::Validation`] if the call mutates.
    pub fn execute_read(&self, store: &dyn EntityStore) -> Result<Value, ToolError> {
        let only_forbidden = match self.kind {
            ToolKind::GetForbiddenItems => true,
            ToolKind::ListItems => false,
            ToolKind::SetItemAllowed => {
                return Err(ToolError::Validation(format!(
                    "{} cannot run against a read-only store",
                    self.kind.name()
                )));
            }
        };

        let (resolution, targets) = self.targets(store)?;
        let items: Vec<ItemRecord> = targets
            .into_iter()
            // A raw flag on a thing without the capability is not forbidden.
            .filter(|&id| !only_forbidden || AllowedMutation.state(store, id) == Some(false))
            .filter_map(|id| store.thing(id))
            .map(|thing| ItemRecord {
                id: thing.id,
                name: store.label_of(thing),
                def: thing.def_name.clone(),
                x: thing.position.x,
                z: thing.position.z,
                stockpile: store.stockpile_at(thing.position).map(|zone| zone.name.clone()),
            })
            .collect();

        let listing = ItemListing::new(items);
        info!(
            tool = self.kind.name(),
            mode = %resolution.mode,
            count = listing.count,
            "Tool executed"
        );
        Ok(serde_json::to_value(listing)?)
    }

    fn set_item_allowed(&self, store: &mut dyn EntityStore) -> Result<Value, ToolError> {
        let (resolution, targets) = self.targets(store)?;
        let outcome = mutation::apply(store, &targets, self.allowed, &AllowedMutation);
        let report = MutationReport::from_outcome(resolution.mode.to_string(), outcome);
        info!(
            tool = self.kind.name(),
            mode = %report.targeting_mode,
            allowed = self.allowed,
            changed = report.changed,
            already_correct = report.already_correct,
            total_matched = report.total_matched,
            "Tool executed"
        );
        Ok(serde_json::to_value(report)?)
    }

    /// Resolve the filter, then narrow by stockpile membership.
    fn targets(&self, store: &dyn EntityStore) -> Result<(Resolution, Vec<EntityId>), ToolError> {
        let resolution = resolver::resolve(&self.filter, store)?;
        let targets = resolver::apply_location_filter(resolution.targets.clone(), store, self.location);
        Ok((resolution, targets))
    }
}

/// Validate and run a request against a live store, rendering any failure
/// as an `{ "error": ... }` value.
pub fn execute(store: &mut dyn EntityStore, request: &ToolRequest) -> Value {
    PreparedCall::prepare(request)
        .and_then(|call| call.execute(store))
        .unwrap_or_else(|e| e.to_json())
}
