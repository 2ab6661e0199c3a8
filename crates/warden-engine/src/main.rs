//! Warden engine binary.
//!
//! Wires the simulation host and the tool gateway together: the host owns
//! the entity store on a dedicated thread and drains the dispatch queue
//! once per tick, while the controller loop reads JSON tool calls from
//! stdin on the async runtime and writes one JSON result per line to
//! stdout.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `warden-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the starting world
//! 4. Create the simulation host and its gateway
//! 5. Spawn the simulation thread
//! 6. Serve controller requests until stdin closes or the host stops
//! 7. Stop the host and log the result

mod controller;
mod error;

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use warden_core::config::{LoggingConfig, WardenConfig};
use warden_core::host::{HostControl, HostRunSummary, SimulationHost};
use warden_core::tools::ToolKind;
use warden_world::ThingMap;

use crate::controller::ServeEnd;
use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "warden-config.yaml";

/// Application entry point for the Warden engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails or the simulation
/// thread panics.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = WardenConfig::load_or_default(Path::new(CONFIG_PATH)).map_err(EngineError::from)?;

    // 2. Initialize structured logging. Logs go to stderr; stdout carries
    //    responses only.
    init_logging(&config.logging);

    info!(
        tick_interval_ms = config.host.tick_interval_ms,
        max_ticks = config.host.max_ticks,
        snapshot_reads = config.gateway.snapshot_reads,
        "warden-engine starting"
    );

    // 3. Create the starting world.
    let world = warden_world::create_starting_world(&config.world.starting_world())
        .map_err(EngineError::from)?;
    info!(
        things = world.thing_count(),
        defs = world.def_count(),
        "Starting world created"
    );

    // 4. Create the host and gateway.
    let host = SimulationHost::new(world, &config.gateway);
    let gateway = host.gateway();
    for kind in ToolKind::ALL {
        info!(tool = kind.name(), read_only = kind.is_read_only(), "{}", kind.description());
    }

    // 5. Spawn the simulation thread.
    let control = Arc::new(HostControl::new(&config.host));
    let sim = host.spawn(Arc::clone(&control)).map_err(EngineError::from)?;
    let mut host_exit = tokio::task::spawn_blocking(move || sim.join());
    info!("Simulation thread started, reading requests from stdin");

    // 6. Serve the controller.
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let (end, answered) = controller::serve(&gateway, stdin, &mut stdout, &mut host_exit)
        .await
        .map_err(|e| EngineError::Controller {
            message: format!("{e:#}"),
        })?;

    // 7. Stop the host and collect its result.
    control.request_stop();
    let joined = match end {
        ServeEnd::HostExited(joined) => {
            warn!("Simulation host stopped before the controller");
            joined
        }
        ServeEnd::InputClosed => host_exit.await,
    };
    let summary = match joined {
        Ok(Ok((summary, store))) => {
            log_shutdown(&summary, &store, answered);
            summary
        }
        Ok(Err(_)) | Err(_) => {
            error!("Simulation thread panicked");
            return Err(EngineError::HostPanicked.into());
        }
    };

    info!(
        end_reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        "warden-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Log the final host summary and store state.
fn log_shutdown(summary: &HostRunSummary, store: &ThingMap, answered: u64) {
    info!(
        reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        tasks_run = summary.tasks_run,
        tasks_failed = summary.tasks_failed,
        tasks_abandoned = summary.tasks_abandoned,
        requests_answered = answered,
        things = store.thing_count(),
        "Simulation ended"
    );
}
