//! In-memory entity store with injectable faults.

use async_trait::async_trait;
use fleetview_env::{
    DriverId, DriverRecord, EntityId, EntityRecord, EntityStore, EnvError, RecordFilter, TripId,
    TripRecord,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Simulated entity store.
///
/// Records live in ordered maps so that `find_all` answers in a fixed order.
/// Ids marked *hidden* behave like entities the backend has never heard of:
/// `find_by_id` misses and `find_all` leaves them out.
#[derive(Default)]
pub struct SimStore {
    records: Mutex<BTreeMap<EntityId, EntityRecord>>,
    drivers: Mutex<BTreeMap<DriverId, DriverRecord>>,
    trips: Mutex<BTreeMap<TripId, TripRecord>>,
    hidden: Mutex<HashSet<EntityId>>,

    /// Reject every save
    fail_saves: AtomicBool,

    saves: AtomicU64,
    lookups: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&self, record: EntityRecord) {
        lock(&self.records).insert(record.id.clone(), record);
    }

    pub fn insert_driver(&self, driver: DriverRecord) {
        lock(&self.drivers).insert(driver.id.clone(), driver);
    }

    pub fn insert_trip(&self, trip: TripRecord) {
        lock(&self.trips).insert(trip.id.clone(), trip);
    }

    /// Makes `id` unknown to lookups.
    pub fn hide(&self, id: EntityId) {
        lock(&self.hidden).insert(id);
    }

    pub fn is_hidden(&self, id: &EntityId) -> bool {
        lock(&self.hidden).contains(id)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The stored record for `id`, ignoring the hidden set.
    pub fn record(&self, id: &EntityId) -> Option<EntityRecord> {
        lock(&self.records).get(id).cloned()
    }

    pub fn trip(&self, id: &TripId) -> Option<TripRecord> {
        lock(&self.trips).get(id).cloned()
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// `find_by_id` calls so far.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn visible(&self) -> Vec<EntityRecord> {
        let hidden = lock(&self.hidden);
        lock(&self.records)
            .values()
            .filter(|record| !hidden.contains(&record.id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EntityStore for SimStore {
    async fn find_all(&self) -> Result<Vec<EntityRecord>, EnvError> {
        Ok(self.visible())
    }

    async fn find_where(&self, filter: &RecordFilter) -> Result<Vec<EntityRecord>, EnvError> {
        Ok(self
            .visible()
            .into_iter()
            .filter(|record| filter(record))
            .collect())
    }

    async fn find_by_id(&self, id: &EntityId) -> Result<Option<EntityRecord>, EnvError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.is_hidden(id) {
            return Ok(None);
        }
        Ok(self.record(id))
    }

    async fn save(&self, record: &EntityRecord) -> Result<(), EnvError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(EnvError::store(format!("save rejected for {}", record.id)));
        }
        lock(&self.records).insert(record.id.clone(), record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, EnvError> {
        Ok(lock(&self.drivers).get(id).cloned())
    }

    async fn find_trip(&self, id: &TripId) -> Result<Option<TripRecord>, EnvError> {
        Ok(self.trip(id))
    }

    async fn trips_for_driver(&self, id: &DriverId) -> Result<Vec<TripRecord>, EnvError> {
        Ok(lock(&self.trips)
            .values()
            .filter(|trip| &trip.driver == id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hidden_record_misses() {
        let store = SimStore::new();
        store.insert_record(EntityRecord::new("a", "Van a"));
        store.insert_record(EntityRecord::new("b", "Van b"));
        store.hide(EntityId::from("b"));

        assert!(store.find_by_id(&EntityId::from("a")).await.unwrap().is_some());
        assert!(store.find_by_id(&EntityId::from("b")).await.unwrap().is_none());
        assert_eq!(store.find_all().await.unwrap().len(), 1);
        assert_eq!(store.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_find_where_filters() {
        let store = SimStore::new();
        let mut tracked = EntityRecord::new("a", "Van a");
        tracked.track_on_map = true;
        store.insert_record(tracked);
        store.insert_record(EntityRecord::new("b", "Van b"));

        let found = store.find_where(&|r: &EntityRecord| r.track_on_map).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, EntityId::from("a"));
    }

    #[tokio::test]
    async fn test_failing_saves() {
        let store = SimStore::new();
        store.set_fail_saves(true);

        let result = store.save(&EntityRecord::new("a", "Van a")).await;
        assert!(matches!(result, Err(EnvError::Store(_))));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_trips_for_driver() {
        let store = SimStore::new();
        store.insert_trip(TripRecord {
            id: TripId::from("t1"),
            driver: DriverId::from("d1"),
            events: vec![],
        });
        store.insert_trip(TripRecord {
            id: TripId::from("t2"),
            driver: DriverId::from("d2"),
            events: vec![],
        });

        let trips = store.trips_for_driver(&DriverId::from("d1")).await.unwrap();
        assert_eq!(trips.len(), 1);
    }
}
