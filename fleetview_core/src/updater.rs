//! Marker/trail surface operations.
//!
//! Three paths, all driven by ledger indices:
//! - **add**: append marker then trail, record both indices
//! - **move**: lift both objects out, update, put them back at the same indices
//! - **remove**: lift both objects out, renumber the ledger
//!
//! Removals always take the trail (higher index) first so the marker index is
//! still valid for the second removal.

use crate::error::EngineError;
use crate::fleet::TrackedEntity;
use crate::ledger::{EntityIndexLedger, LedgerEntry, LedgerError};
use fleetview_env::{
    DisplaySurface, EntityId, GeoPoint, MapObject, Marker, MarkerStyle, PathStyle, Polyline,
};
use tracing::debug;

/// Builds and repositions per-entity marker/trail pairs.
#[derive(Debug, Clone)]
pub struct MarkerTrailUpdater {
    marker_style: MarkerStyle,
    trail_style: PathStyle,
}

impl MarkerTrailUpdater {
    pub fn new(marker_style: MarkerStyle, trail_style: PathStyle) -> Self {
        Self {
            marker_style,
            trail_style,
        }
    }

    /// Renders an entity that is not on the surface yet.
    ///
    /// The trail is seeded with every drawable point of the history and the
    /// marker sits on the most recent one. Fails without touching the surface
    /// if the entity is already rendered or has nothing drawable.
    pub fn add<S: DisplaySurface + ?Sized>(
        &self,
        surface: &mut S,
        ledger: &mut EntityIndexLedger,
        entity: &TrackedEntity,
    ) -> Result<LedgerEntry, EngineError> {
        if ledger.contains(&entity.id) {
            return Err(EngineError::DuplicateEntry(entity.id.clone()));
        }

        let positions = entity.history.positions();
        let latest = *positions
            .last()
            .ok_or_else(|| EngineError::NothingToRender(entity.id.clone()))?;

        let marker = Marker::new(
            entity.id.clone(),
            entity.label(),
            latest,
            self.marker_style.clone(),
        );
        let trail = Polyline::new(Some(entity.id.clone()), positions, self.trail_style.clone());

        let marker_index = surface.len();
        let trail_index = marker_index + 1;
        surface.append(MapObject::Marker(marker));
        surface.append(MapObject::Path(trail));
        ledger.insert(entity.id.clone(), marker_index, trail_index)?;

        debug!(entity = %entity.id, marker_index, trail_index, "Added entity to surface");
        Ok(LedgerEntry {
            entity_id: entity.id.clone(),
            marker_index,
            trail_index,
        })
    }

    /// Moves a rendered entity's marker to `point` and extends its trail.
    ///
    /// Both objects go back to the indices they came from, so every other
    /// entity's ledger entry stays valid.
    pub fn move_to<S: DisplaySurface + ?Sized>(
        &self,
        surface: &mut S,
        ledger: &EntityIndexLedger,
        entity_id: &EntityId,
        point: GeoPoint,
    ) -> Result<(), EngineError> {
        let entry = ledger
            .lookup(entity_id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownEntry(entity_id.clone()))?;

        let (marker_obj, trail_obj) = Self::lift(surface, &entry)?;

        let (mut marker, mut trail) = match (marker_obj, trail_obj) {
            (MapObject::Marker(marker), MapObject::Path(trail)) => (marker, trail),
            (marker_obj, trail_obj) => {
                let found = format!("{}/{}", marker_obj.kind(), trail_obj.kind());
                surface.insert_at(entry.marker_index, marker_obj)?;
                surface.insert_at(entry.trail_index, trail_obj)?;
                return Err(EngineError::SurfaceMismatch {
                    index: entry.marker_index,
                    expected: "marker/path",
                    found,
                });
            }
        };

        marker.set_location(point);
        trail.push_location(point);

        surface.insert_at(entry.marker_index, MapObject::Marker(marker))?;
        surface.insert_at(entry.trail_index, MapObject::Path(trail))?;
        Ok(())
    }

    /// Takes an entity off the surface and renumbers the ledger.
    pub fn remove<S: DisplaySurface + ?Sized>(
        &self,
        surface: &mut S,
        ledger: &mut EntityIndexLedger,
        entity_id: &EntityId,
    ) -> Result<LedgerEntry, EngineError> {
        let entry = ledger
            .lookup(entity_id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownEntry(entity_id.clone()))?;

        Self::lift(surface, &entry)?;
        let removed = ledger.remove_and_renumber(entity_id)?;

        debug!(entity = %entity_id, marker_index = removed.marker_index, "Removed entity from surface");
        Ok(removed)
    }

    /// Removes trail then marker, returning `(marker, trail)`.
    fn lift<S: DisplaySurface + ?Sized>(
        surface: &mut S,
        entry: &LedgerEntry,
    ) -> Result<(MapObject, MapObject), EngineError> {
        let len = surface.len();
        let trail = surface
            .remove_at(entry.trail_index)
            .ok_or_else(|| EngineError::SurfaceMismatch {
                index: entry.trail_index,
                expected: "path",
                found: format!("nothing (len {})", len),
            })?;

        match surface.remove_at(entry.marker_index) {
            Some(marker) => Ok((marker, trail)),
            None => {
                // Put the trail back before reporting.
                surface.insert_at(entry.trail_index.min(surface.len()), trail)?;
                Err(EngineError::SurfaceMismatch {
                    index: entry.marker_index,
                    expected: "marker",
                    found: "nothing".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_env::{RawLocation, VecSurface};

    fn updater() -> MarkerTrailUpdater {
        MarkerTrailUpdater::new(MarkerStyle::default(), PathStyle::new("#4caf50", 5))
    }

    fn entity(name: &str, points: &[(f64, f64)]) -> TrackedEntity {
        let mut e = TrackedEntity::observed(EntityId::from(name));
        for (i, (lat, lon)) in points.iter().enumerate() {
            e.history
                .push(RawLocation::new(*lat, *lon, 0.0, 0.0).normalize(i as i64));
        }
        e
    }

    fn marker_at(surface: &VecSurface, index: usize) -> &Marker {
        surface.get(index).and_then(MapObject::as_marker).unwrap()
    }

    fn trail_at(surface: &VecSurface, index: usize) -> &Polyline {
        surface.get(index).and_then(MapObject::as_path).unwrap()
    }

    #[test]
    fn test_add_two_then_remove_first() {
        let mut surface = VecSurface::new();
        let mut ledger = EntityIndexLedger::new();
        let up = updater();

        let x = up.add(&mut surface, &mut ledger, &entity("X", &[(1.0, 1.0)])).unwrap();
        let y = up.add(&mut surface, &mut ledger, &entity("Y", &[(2.0, 2.0)])).unwrap();
        assert_eq!((x.marker_index, x.trail_index), (0, 1));
        assert_eq!((y.marker_index, y.trail_index), (2, 3));

        up.remove(&mut surface, &mut ledger, &EntityId::from("X")).unwrap();

        let y = ledger.lookup(&EntityId::from("Y")).unwrap();
        assert_eq!((y.marker_index, y.trail_index), (0, 1));
        assert_eq!(surface.len(), 2);
        assert_eq!(marker_at(&surface, 0).owner, EntityId::from("Y"));
        assert_eq!(trail_at(&surface, 1).owner, Some(EntityId::from("Y")));
    }

    #[test]
    fn test_add_seeds_trail_with_history() {
        let mut surface = VecSurface::new();
        let mut ledger = EntityIndexLedger::new();

        updater()
            .add(&mut surface, &mut ledger, &entity("X", &[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]))
            .unwrap();

        assert_eq!(marker_at(&surface, 0).location, GeoPoint::new(3.0, 3.0));
        assert_eq!(trail_at(&surface, 1).locations().len(), 3);
    }

    #[test]
    fn test_add_duplicate_leaves_surface_alone() {
        let mut surface = VecSurface::new();
        let mut ledger = EntityIndexLedger::new();
        let up = updater();
        let x = entity("X", &[(1.0, 1.0)]);

        up.add(&mut surface, &mut ledger, &x).unwrap();
        let err = up.add(&mut surface, &mut ledger, &x).unwrap_err();

        assert!(matches!(err, EngineError::DuplicateEntry(_)));
        assert_eq!(surface.len(), 2);
    }

    #[test]
    fn test_add_without_positions_is_skipped() {
        let mut surface = VecSurface::new();
        let mut ledger = EntityIndexLedger::new();

        let err = updater()
            .add(&mut surface, &mut ledger, &entity("X", &[]))
            .unwrap_err();

        assert!(matches!(err, EngineError::NothingToRender(_)));
        assert!(surface.is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_move_updates_marker_and_trail_in_place() {
        let mut surface = VecSurface::new();
        let mut ledger = EntityIndexLedger::new();
        let up = updater();
        up.add(&mut surface, &mut ledger, &entity("X", &[(1.0, 1.0)])).unwrap();
        up.add(&mut surface, &mut ledger, &entity("Y", &[(2.0, 2.0)])).unwrap();

        up.move_to(&mut surface, &ledger, &EntityId::from("X"), GeoPoint::new(5.0, 6.0))
            .unwrap();

        assert_eq!(marker_at(&surface, 0).location, GeoPoint::new(5.0, 6.0));
        assert_eq!(trail_at(&surface, 1).locations().len(), 2);
        assert_eq!(surface.len(), 4);
    }

    #[test]
    fn test_move_preserves_others() {
        let mut surface = VecSurface::new();
        let mut ledger = EntityIndexLedger::new();
        let up = updater();
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            up.add(&mut surface, &mut ledger, &entity(name, &[(i as f64, 0.0)])).unwrap();
        }
        let before_b = ledger.lookup(&EntityId::from("B")).cloned().unwrap();
        let before_c = ledger.lookup(&EntityId::from("C")).cloned().unwrap();

        for step in 0..5 {
            up.move_to(&mut surface, &ledger, &EntityId::from("A"), GeoPoint::new(step as f64, 1.0))
                .unwrap();
        }

        assert_eq!(ledger.lookup(&EntityId::from("B")), Some(&before_b));
        assert_eq!(ledger.lookup(&EntityId::from("C")), Some(&before_c));
        assert_eq!(trail_at(&surface, before_b.trail_index).locations().len(), 1);
        assert_eq!(trail_at(&surface, before_c.trail_index).locations().len(), 1);
        assert_eq!(trail_at(&surface, 1).locations().len(), 6);
    }

    #[test]
    fn test_move_detects_mismatch_and_restores() {
        let mut surface = VecSurface::new();
        let mut ledger = EntityIndexLedger::new();
        // Two bare paths where the ledger expects a marker/trail pair.
        surface.append(MapObject::Path(Polyline::new(None, vec![], PathStyle::new("#000000", 1))));
        surface.append(MapObject::Path(Polyline::new(None, vec![], PathStyle::new("#ffffff", 1))));
        ledger.insert(EntityId::from("X"), 0, 1).unwrap();

        let err = updater()
            .move_to(&mut surface, &ledger, &EntityId::from("X"), GeoPoint::new(0.0, 0.0))
            .unwrap_err();

        assert!(matches!(err, EngineError::SurfaceMismatch { index: 0, .. }));
        assert_eq!(surface.len(), 2);
        assert_eq!(trail_at(&surface, 0).style.stroke_color, "#000000");
    }

    #[test]
    fn test_move_unknown_entity() {
        let mut surface = VecSurface::new();
        let ledger = EntityIndexLedger::new();

        let err = updater()
            .move_to(&mut surface, &ledger, &EntityId::from("X"), GeoPoint::new(0.0, 0.0))
            .unwrap_err();

        assert!(matches!(err, EngineError::Ledger(LedgerError::UnknownEntry(_))));
    }
}
