//! Simulation harness errors.

use fleetview_core::{ConfigError, EngineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// The engine rejected a harness action
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// An engine invariant did not hold after a frame
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// The fleet did not converge on the desired set
    #[error("Not converged: {0}")]
    Divergence(String),

    /// The runtime could not be built
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
