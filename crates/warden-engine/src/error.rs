//! Error types for the Warden engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and shutdown.

/// Top-level error for the Warden engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: warden_core::config::ConfigError,
    },

    /// Starting world construction failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: warden_world::WorldError,
    },

    /// The simulation thread could not be started.
    #[error("failed to spawn simulation thread: {source}")]
    Spawn {
        /// The underlying OS error.
        #[from]
        source: std::io::Error,
    },

    /// The controller loop failed on I/O.
    #[error("controller error: {message}")]
    Controller {
        /// Description of the controller failure.
        message: String,
    },

    /// The simulation thread panicked.
    #[error("simulation thread panicked")]
    HostPanicked,
}
