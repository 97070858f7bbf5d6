//! Entity store abstraction (persistence and querying).

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{DriverId, DriverRecord, EntityId, EntityRecord, TripId, TripRecord};

/// Predicate used by [`EntityStore::find_where`].
pub type RecordFilter = dyn Fn(&EntityRecord) -> bool + Send + Sync;

/// Persistence and querying of entities, drivers and trips.
///
/// The engine never blocks on the store: every call is spawned through the
/// context and its result is delivered back on the engine queue. A store that
/// never answers stalls only the entity that asked.
///
/// # Implementations
///
/// - **Production**: REST/database client owned by the embedding application
/// - **Simulation**: `SimStore` - in-memory records with injectable misses
#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    /// Returns every entity record.
    async fn find_all(&self) -> Result<Vec<EntityRecord>, EnvError>;

    /// Returns every entity record matching `filter`.
    async fn find_where(&self, filter: &RecordFilter) -> Result<Vec<EntityRecord>, EnvError>;

    /// Resolves a single entity.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - The entity exists
    /// * `Ok(None)` - No such entity (a lookup miss, not an error)
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<EntityRecord>, EnvError>;

    /// Persists an entity record (tracked flag and location history).
    async fn save(&self, record: &EntityRecord) -> Result<(), EnvError>;

    /// Resolves a single driver.
    async fn find_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, EnvError>;

    /// Resolves a single trip.
    async fn find_trip(&self, id: &TripId) -> Result<Option<TripRecord>, EnvError>;

    /// Returns the trips driven by a driver.
    async fn trips_for_driver(&self, id: &DriverId) -> Result<Vec<TripRecord>, EnvError>;
}
