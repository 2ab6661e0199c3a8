//! Error types surfaced to the controller by tool calls.
//!
//! Every failure path degrades to a structured `{ "error": ... }` value via
//! [`ToolError::to_json`]; none of them is fatal to the host.

use serde_json::{Value, json};

use crate::dispatch::DispatchError;
use crate::resolver::ResolveError;

/// Errors returned by tool calls.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A required field is missing or malformed. Reported before any
    /// resolution runs.
    #[error("{0}")]
    Validation(String),

    /// A rectangle expands into more cells than a single call may touch.
    #[error("Too many cells ({cells}). Maximum {max} cells per call (50x50).")]
    RegionTooLarge {
        /// Cells requested.
        cells: u64,
        /// Configured maximum.
        max: u64,
    },

    /// The filter named something that does not exist.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The action name is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The queued task failed or never ran.
    #[error("Tool execution failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// A result could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Render the error as the controller-facing `{ "error": ... }` value.
    pub fn to_json(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}
