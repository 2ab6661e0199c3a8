//! Target resolution, mutation, and main-thread dispatch for the Warden
//! tool-call engine.
//!
//! A controller issues loosely typed `{action, args}` requests from any
//! thread. This crate validates them, routes the work onto the simulation
//! thread through a FIFO dispatch queue, resolves the arguments to a
//! concrete set of entities, and applies an idempotent mutation or builds
//! a read-only listing.
//!
//! # Modules
//!
//! - [`json`] -- Explicit key-presence checks and lenient scalar coercion.
//! - [`filter`] -- Argument payload to [`FilterSpec`] with fixed precedence.
//! - [`resolver`] -- [`FilterSpec`] to a deduplicated target list plus the
//!   [`TargetingMode`] that fired.
//! - [`mutation`] -- The [`Mutation`] capability and the idempotent applier.
//! - [`dispatch`] -- [`DispatchQueue`], task handles, and drain reports.
//! - [`tools`] -- The tool registry and request execution.
//! - [`gateway`] -- [`ToolGateway`], the caller-side entry point.
//! - [`host`] -- [`SimulationHost`], the tick loop that owns the store.
//! - [`config`] -- Configuration loading from `warden-config.yaml`.
//! - [`error`] -- [`ToolError`] and its `{ "error": ... }` rendering.
//!
//! [`FilterSpec`]: filter::FilterSpec
//! [`TargetingMode`]: resolver::TargetingMode
//! [`Mutation`]: mutation::Mutation
//! [`DispatchQueue`]: dispatch::DispatchQueue
//! [`ToolGateway`]: gateway::ToolGateway
//! [`SimulationHost`]: host::SimulationHost
//! [`ToolError`]: error::ToolError

pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod host;
pub mod json;
pub mod mutation;
pub mod resolver;
pub mod tools;
