//! FleetView Core - live fleet synchronization engine
//!
//! Keeps one marker and one trail per tracked vehicle on an index-addressed
//! map surface, in step with a user-controlled desired tracked set and a live
//! stream of location updates:
//! 1. **Reconciliation**: desired ids vs rendered ids, with asynchronous lookups
//!    re-checked on resolution so toggles never leave orphans
//! 2. **Index bookkeeping**: an explicit ledger renumbered on every removal,
//!    because the surface has no stable handles
//! 3. **Trip playback**: a single highlighted path at reserved index 0

pub mod config;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod ingest;
pub mod ledger;
pub mod reconciler;
pub mod selection;
pub mod stats;
pub mod trip_overlay;
pub mod updater;

// Re-export key types for convenience
pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineEvent, EngineHandle, FleetEngine};
pub use error::EngineError;
pub use fleet::{FleetRegistry, LocationHistory, TrackedEntity};
pub use ingest::{IngestEffect, IngestReport, LocationEventProcessor};
pub use ledger::{EntityIndexLedger, LedgerEntry, LedgerError, LedgerViolation};
pub use reconciler::{DesiredTrackedSet, ReconcileReport, ResolveOutcome, TrackedSetReconciler};
pub use selection::SelectionState;
pub use stats::EngineStats;
pub use trip_overlay::{TripOverlay, OVERLAY_INDEX};
pub use updater::MarkerTrailUpdater;
