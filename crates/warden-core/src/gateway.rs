//! Caller-side entry point for tool calls.
//!
//! A [`ToolGateway`] validates a request on the calling thread, wraps the
//! resolve + mutate + format work into one dispatch task, and waits for the
//! simulation thread to run it. Read-only tools may instead run inline
//! against the last published [`StoreSnapshot`] when snapshot reads are
//! enabled.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use warden_world::EntityStore;

use crate::dispatch::DispatchQueue;
use crate::error::ToolError;
use crate::host::StoreSnapshot;
use crate::tools::{PreparedCall, ToolRequest};

/// Cloneable handle for issuing tool calls from any thread.
#[derive(Debug)]
pub struct ToolGateway<W> {
    queue: Arc<DispatchQueue<W>>,
    snapshot: Option<Arc<StoreSnapshot<W>>>,
}

impl<W> Clone for ToolGateway<W> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<W: EntityStore + 'static> ToolGateway<W> {
    /// Bind a gateway to a queue and, optionally, a snapshot for reads.
    pub const fn new(queue: Arc<DispatchQueue<W>>, snapshot: Option<Arc<StoreSnapshot<W>>>) -> Self {
        Self { queue, snapshot }
    }

    /// Run a tool call and render the outcome, success or failure, as
    /// JSON.
    pub async fn call(&self, request: ToolRequest) -> Value {
        let action = request.action.clone();
        self.try_call(request).await.unwrap_or_else(|e| {
            warn!(tool = %action, error = %e, "Tool call failed");
            e.to_json()
        })
    }

    /// Run a tool call.
    ///
    /// Validation errors are returned before anything is queued.
    ///
    /// # Errors
    ///
    /// Returns the [`ToolError`] produced by validation, resolution, or the
    /// dispatch layer.
    pub async fn try_call(&self, request: ToolRequest) -> Result<Value, ToolError> {
        let call = PreparedCall::prepare(&request)?;
        if let Some(result) = self.read_from_snapshot(&call) {
            return result;
        }
        let handle = self.queue.enqueue(move |store: &mut W| call.execute(store));
        debug!(tool = %request.action, seq = handle.seq(), "Tool call queued");
        handle.wait().await?
    }

    /// Blocking variant of [`ToolGateway::call`] for threads outside any
    /// async runtime.
    pub fn call_blocking(&self, request: &ToolRequest) -> Value {
        let outcome = PreparedCall::prepare(request).and_then(|call| {
            if let Some(result) = self.read_from_snapshot(&call) {
                return result;
            }
            self.queue
                .enqueue(move |store: &mut W| call.execute(store))
                .wait_blocking()?
        });
        outcome.unwrap_or_else(|e| {
            warn!(tool = %request.action, error = %e, "Tool call failed");
            e.to_json()
        })
    }

    /// Serve a read-only call from the snapshot when one is available.
    fn read_from_snapshot(&self, call: &PreparedCall) -> Option<Result<Value, ToolError>> {
        if !call.kind().is_read_only() {
            return None;
        }
        let snapshot = self.snapshot.as_ref()?;
        let store = snapshot.latest()?;
        debug!(tool = call.kind().name(), tick = snapshot.tick(), "Serving read from snapshot");
        Some(call.execute_read(&*store))
    }
}
