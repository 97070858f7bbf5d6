//! Engine counters.

use serde::Serialize;

/// Running counts of what the engine did and what it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Frames processed
    pub frames: u64,
    /// Events handled
    pub events: u64,
    /// Reconcile passes run
    pub reconcile_passes: u64,
    /// Entity lookups spawned
    pub lookups_spawned: u64,
    /// Lookups that found no entity
    pub lookup_misses: u64,
    /// Entities drawn
    pub renders: u64,
    /// Move-path updates
    pub moves: u64,
    /// Entities taken off the surface
    pub removals: u64,
    /// Lookups dropped because the id was toggled off in flight
    pub stale_resolutions: u64,
    /// Adds refused because the entity was already rendered
    pub duplicate_skips: u64,
    /// Renders skipped because no surface was attached
    pub surface_unavailable: u64,
    /// Locations stored without coordinates
    pub malformed_locations: u64,
    /// Locations stamped with ingestion time
    pub defaulted_timestamps: u64,
    /// Store or feed calls that failed
    pub collaborator_failures: u64,
    /// Ledger or surface inconsistencies detected
    pub invariant_violations: u64,
    /// Trip results dropped as superseded
    pub stale_trips: u64,
}
