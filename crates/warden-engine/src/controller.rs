//! JSON-lines controller loop.
//!
//! Reads one `{"action": ..., "args": {...}}` object per input line, runs
//! it through the [`ToolGateway`], and writes one JSON result per output
//! line. Requests are answered in arrival order. Malformed lines get an
//! `{"error": ...}` response and the loop keeps going.

use std::future::Future;

use anyhow::Context as _;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use warden_core::gateway::ToolGateway;
use warden_core::tools::ToolRequest;
use warden_world::EntityStore;

/// How the controller loop ended.
#[derive(Debug)]
pub enum ServeEnd<T> {
    /// The input stream closed.
    InputClosed,
    /// The simulation host finished first; carries its exit value.
    HostExited(T),
}

/// Answer requests from `input` until it closes or `host_exit` resolves.
///
/// `host_exit` is raced against both reading and waiting on a call, so a
/// host that stops mid-request never leaves the controller hanging.
pub async fn serve<W, R, O, H>(
    gateway: &ToolGateway<W>,
    input: R,
    output: &mut O,
    host_exit: &mut H,
) -> anyhow::Result<(ServeEnd<H::Output>, u64)>
where
    W: EntityStore + 'static,
    R: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    H: Future + Unpin,
{
    let mut lines = input.lines();
    let mut answered: u64 = 0;

    loop {
        let line = tokio::select! {
            exit = &mut *host_exit => return Ok((ServeEnd::HostExited(exit), answered)),
            line = lines.next_line() => line.context("failed to read request line")?,
        };
        let Some(line) = line else {
            info!(answered, "Controller input closed");
            return Ok((ServeEnd::InputClosed, answered));
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = tokio::select! {
            exit = &mut *host_exit => return Ok((ServeEnd::HostExited(exit), answered)),
            response = respond(gateway, &line) => response,
        };

        let mut encoded = serde_json::to_string(&response).context("failed to encode response")?;
        encoded.push('\n');
        output
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write response")?;
        output.flush().await.context("failed to flush response")?;
        answered = answered.saturating_add(1);
    }
}

/// Decode one request line and run it.
async fn respond<W: EntityStore + 'static>(gateway: &ToolGateway<W>, line: &str) -> Value {
    match serde_json::from_str::<ToolRequest>(line) {
        Ok(request) => {
            debug!(action = %request.action, "Request received");
            gateway.call(request).await
        }
        Err(e) => {
            warn!(error = %e, "Malformed request line");
            json!({ "error": format!("Invalid request: {e}") })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use warden_core::config::{GatewayConfig, HostConfig};
    use warden_core::host::{HostControl, SimulationHost};
    use warden_world::{StartingWorldSpec, create_starting_world};

    use super::*;

    #[tokio::test]
    async fn answers_each_line_in_order() {
        let world = create_starting_world(&StartingWorldSpec::default()).unwrap();
        let host = SimulationHost::new(world, &GatewayConfig::default());
        let gateway = host.gateway();
        let control = Arc::new(HostControl::new(&HostConfig {
            tick_interval_ms: 1,
            max_ticks: 0,
        }));
        let sim = host.spawn(Arc::clone(&control)).unwrap();

        let input = concat!(
            r#"{"action": "set_item_allowed", "args": {"category": "food", "allowed": true}}"#,
            "\n\n",
            "not json\n",
            r#"{"action": "teleport"}"#,
            "\n",
        );
        let mut output = Vec::new();
        let mut never = std::future::pending::<()>();
        let (end, answered) = serve(&gateway, input.as_bytes(), &mut output, &mut never)
            .await
            .unwrap();
        assert!(matches!(end, ServeEnd::InputClosed));
        assert_eq!(answered, 3);

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["targeting_mode"], json!("category:food"));
        assert!(responses[1]["error"].as_str().unwrap().starts_with("Invalid request"));
        assert_eq!(responses[2], json!({"error": "Unknown tool: teleport"}));

        control.request_stop();
        sim.join().unwrap();
    }

    #[tokio::test]
    async fn stops_when_the_host_exits() {
        let world = create_starting_world(&StartingWorldSpec::default()).unwrap();
        let host = SimulationHost::new(world, &GatewayConfig::default());
        let gateway = host.gateway();

        // Nothing ever drains this queue, so only the host exit can end the
        // call.
        let input = r#"{"action": "list_items", "args": {}}"#.as_bytes();
        let mut output = Vec::new();
        let mut exited = std::future::ready(7_u8);
        let (end, answered) = serve(&gateway, input, &mut output, &mut exited)
            .await
            .unwrap();
        assert!(matches!(end, ServeEnd::HostExited(7)));
        assert_eq!(answered, 0);
        assert!(output.is_empty());
        drop(host);
    }
}
