//! Engine error taxonomy.
//!
//! Nothing here is fatal. Component functions return these errors and the
//! engine's event handlers log and count them at the boundary.

use crate::ledger::LedgerError;
use fleetview_env::{EntityId, EnvError};

/// Errors produced by the synchronization engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// An entity lookup found nothing; the id stays unrendered
    #[error("Lookup miss: {0}")]
    LookupMiss(EntityId),

    /// No display surface has been attached yet
    #[error("Display surface not attached")]
    SurfaceUnavailable,

    /// An add was attempted for an entity that is already rendered
    #[error("Entity already rendered: {0}")]
    DuplicateEntry(EntityId),

    /// A location record lacks coordinates
    #[error("Malformed location for {entity_id}: {reason}")]
    MalformedLocation { entity_id: EntityId, reason: String },

    /// A ledger index did not hold the object kind it should
    #[error("Surface mismatch at index {index}: expected {expected}, found {found}")]
    SurfaceMismatch {
        index: usize,
        expected: &'static str,
        found: String,
    },

    /// The entity has no drawable position yet
    #[error("Nothing to render for {0}")]
    NothingToRender(EntityId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Env(#[from] EnvError),
}
