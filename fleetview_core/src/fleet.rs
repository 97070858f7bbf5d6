//! In-memory view of the fleet: every entity the engine has observed and its
//! append-only location history.

use fleetview_env::{EntityId, EntityRecord, GeoPoint, LocationPoint};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Append-only log of an entity's locations, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationHistory {
    points: Vec<LocationPoint>,
}

impl LocationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: LocationPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[LocationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drawable positions, oldest first. Malformed points are skipped.
    pub fn positions(&self) -> Vec<GeoPoint> {
        self.points.iter().filter_map(LocationPoint::position).collect()
    }

    /// The most recent drawable position.
    pub fn latest_position(&self) -> Option<GeoPoint> {
        self.points.iter().rev().find_map(LocationPoint::position)
    }

    /// Folds a stored history under this one.
    ///
    /// Stored points come first; live points already present in the store
    /// (same timestamp and coordinates) are kept once.
    pub fn merge_stored(&mut self, stored: Vec<LocationPoint>) {
        let live = std::mem::replace(&mut self.points, stored);
        let fresh: Vec<LocationPoint> = live
            .into_iter()
            .filter(|point| !self.points.iter().any(|known| same_fix(known, point)))
            .collect();
        self.points.extend(fresh);
    }
}

fn same_fix(a: &LocationPoint, b: &LocationPoint) -> bool {
    a.timestamp == b.timestamp && a.latitude == b.latitude && a.longitude == b.longitude
}

impl From<Vec<LocationPoint>> for LocationHistory {
    fn from(points: Vec<LocationPoint>) -> Self {
        Self { points }
    }
}

/// One vehicle as the engine knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub name: String,
    pub driver_name: Option<String>,
    /// Mirrors desired-set membership; persisted with the record
    pub tracked: bool,
    pub active: bool,
    /// True once the entity has been resolved from the store
    pub stored: bool,
    pub history: LocationHistory,
}

impl TrackedEntity {
    /// An entity first seen on the live feed, with no stored record yet.
    pub fn observed(id: EntityId) -> Self {
        Self {
            name: id.to_string(),
            id,
            driver_name: None,
            tracked: false,
            active: true,
            stored: false,
            history: LocationHistory::new(),
        }
    }

    /// Tooltip text for this entity's marker.
    pub fn label(&self) -> &str {
        self.driver_name.as_deref().unwrap_or(&self.name)
    }

    /// Snapshot for persistence.
    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            driver_name: self.driver_name.clone(),
            track_on_map: self.tracked,
            active: self.active,
            locations: self.history.points().to_vec(),
        }
    }
}

impl From<EntityRecord> for TrackedEntity {
    fn from(record: EntityRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            driver_name: record.driver_name,
            tracked: record.track_on_map,
            active: record.active,
            stored: true,
            history: LocationHistory::from(record.locations),
        }
    }
}

/// Every entity observed during the session. Entities are never removed.
#[derive(Debug, Default)]
pub struct FleetRegistry {
    entities: HashMap<EntityId, TrackedEntity>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &EntityId) -> Option<&TrackedEntity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut TrackedEntity> {
        self.entities.get_mut(id)
    }

    /// Returns the entity, registering an untracked one if it is unknown.
    pub fn get_or_observe(&mut self, id: &EntityId) -> &mut TrackedEntity {
        self.entities
            .entry(id.clone())
            .or_insert_with(|| TrackedEntity::observed(id.clone()))
    }

    /// Merges a record from the store into the registry.
    ///
    /// A known entity keeps every live point it has not saved yet, after the
    /// stored ones.
    pub fn merge_record(&mut self, record: EntityRecord) -> &mut TrackedEntity {
        match self.entities.entry(record.id.clone()) {
            Entry::Occupied(slot) => {
                let existing = slot.into_mut();
                existing.name = record.name;
                existing.driver_name = record.driver_name;
                existing.active = record.active;
                existing.stored = true;
                existing.history.merge_stored(record.locations);
                existing
            }
            Entry::Vacant(slot) => slot.insert(TrackedEntity::from(record)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_env::RawLocation;

    fn point(lat: f64, lon: f64, ts: i64) -> LocationPoint {
        RawLocation::new(lat, lon, 0.0, 0.0).with_timestamp(ts).normalize(0)
    }

    #[test]
    fn test_latest_position_skips_malformed() {
        let mut history = LocationHistory::new();
        history.push(point(1.0, 2.0, 1));
        history.push(RawLocation::default().normalize(2));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest_position(), Some(GeoPoint::new(1.0, 2.0)));
        assert_eq!(history.positions().len(), 1);
    }

    #[test]
    fn test_record_round_trip_keeps_flag_and_history() {
        let mut record = EntityRecord::new("car-1", "Van 1");
        record.track_on_map = true;
        record.locations.push(point(1.0, 2.0, 10));

        let entity = TrackedEntity::from(record.clone());
        assert!(entity.tracked);
        assert_eq!(entity.to_record(), record);
    }

    #[test]
    fn test_label_prefers_driver_name() {
        let mut entity = TrackedEntity::observed(EntityId::from("car-1"));
        assert_eq!(entity.label(), "car-1");

        entity.driver_name = Some("Ada".to_string());
        assert_eq!(entity.label(), "Ada");
    }

    fn timestamps(history: &LocationHistory) -> Vec<i64> {
        history.points().iter().map(|p| p.timestamp).collect()
    }

    #[test]
    fn test_merge_puts_stored_points_before_live_ones() {
        let mut registry = FleetRegistry::new();
        let id = EntityId::from("car-1");
        registry.get_or_observe(&id).history.push(point(5.0, 5.0, 1_000));

        let mut record = EntityRecord::new("car-1", "Van 1");
        record.locations.push(point(1.0, 1.0, 1));
        record.locations.push(point(2.0, 2.0, 2));
        let merged = registry.merge_record(record);

        assert_eq!(merged.name, "Van 1");
        assert!(merged.stored);
        assert_eq!(timestamps(&merged.history), vec![1, 2, 1_000]);
        assert_eq!(merged.history.latest_position(), Some(GeoPoint::new(5.0, 5.0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_merge_keeps_short_stored_history() {
        let mut registry = FleetRegistry::new();
        let id = EntityId::from("car-1");
        {
            let entity = registry.get_or_observe(&id);
            for ts in [100, 101, 102] {
                entity.history.push(point(ts as f64, 0.0, ts));
            }
        }

        let mut record = EntityRecord::new("car-1", "Van 1");
        record.locations.push(point(9.0, 9.0, 1));
        let merged = registry.merge_record(record);

        assert_eq!(timestamps(&merged.history), vec![1, 100, 101, 102]);
    }

    #[test]
    fn test_merge_does_not_duplicate_saved_points() {
        let mut registry = FleetRegistry::new();
        let id = EntityId::from("car-1");
        {
            let entity = registry.get_or_observe(&id);
            entity.history.push(point(1.0, 1.0, 1));
            entity.history.push(point(2.0, 2.0, 2));
        }

        let mut record = EntityRecord::new("car-1", "Van 1");
        record.locations.push(point(1.0, 1.0, 1));
        let merged = registry.merge_record(record);

        assert_eq!(timestamps(&merged.history), vec![1, 2]);
    }
}
