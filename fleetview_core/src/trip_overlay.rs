//! The trip playback overlay.
//!
//! A single unowned path at surface index 0, installed before any entity is
//! rendered. Entity objects always sit above it, so the ledger never has to
//! account for the overlay.

use crate::error::EngineError;
use fleetview_env::{DisplaySurface, GeoPoint, MapObject, PathStyle, Polyline, ViewControls};
use tracing::debug;

/// Surface index reserved for the overlay.
pub const OVERLAY_INDEX: usize = 0;

/// Owns the index-0 highlighted path.
#[derive(Debug, Clone)]
pub struct TripOverlay {
    style: PathStyle,
    installed: bool,
}

impl TripOverlay {
    pub fn new(style: PathStyle) -> Self {
        Self {
            style,
            installed: false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Inserts an empty overlay path at index 0.
    pub fn install<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S) -> Result<(), EngineError> {
        let path = Polyline::new(None, Vec::new(), self.style.clone());
        surface.insert_at(OVERLAY_INDEX, MapObject::Path(path))?;
        self.installed = true;
        debug!("Installed trip overlay");
        Ok(())
    }

    /// Replaces the overlay's points.
    pub fn set_path<S: DisplaySurface + ?Sized>(
        &self,
        surface: &mut S,
        points: Vec<GeoPoint>,
    ) -> Result<(), EngineError> {
        let found = surface
            .get(OVERLAY_INDEX)
            .map(|obj| obj.kind().to_string())
            .unwrap_or_else(|| "nothing".to_string());

        let path = surface
            .get_mut(OVERLAY_INDEX)
            .and_then(MapObject::as_path_mut)
            .filter(|path| path.owner.is_none())
            .ok_or(EngineError::SurfaceMismatch {
                index: OVERLAY_INDEX,
                expected: "overlay path",
                found,
            })?;

        path.set_locations(points);
        Ok(())
    }

    /// Empties the overlay.
    pub fn clear<S: DisplaySurface + ?Sized>(&self, surface: &mut S) -> Result<(), EngineError> {
        self.set_path(surface, Vec::new())
    }

    /// The overlay's current points, if it is in place.
    pub fn points<S: DisplaySurface + ?Sized>(surface: &S) -> Option<&[GeoPoint]> {
        surface
            .get(OVERLAY_INDEX)
            .and_then(MapObject::as_path)
            .filter(|path| path.owner.is_none())
            .map(Polyline::locations)
    }

    /// Centers the view on the first point. Returns false for an empty list.
    pub fn center_on_first<V: ViewControls + ?Sized>(
        view: &mut V,
        points: &[GeoPoint],
        zoom: u8,
    ) -> bool {
        match points.first() {
            Some(first) => {
                view.center_view(*first, zoom);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_env::{EntityId, Marker, MarkerStyle, Panel, VecSurface};

    #[derive(Default)]
    struct RecordingView {
        centered: Vec<(GeoPoint, u8)>,
    }

    impl ViewControls for RecordingView {
        fn center_view(&mut self, point: GeoPoint, zoom: u8) {
            self.centered.push((point, zoom));
        }
        fn set_panel_expanded(&mut self, _panel: Panel, _expanded: bool) {}
        fn set_driver_view_visible(&mut self, _visible: bool) {}
    }

    fn overlay() -> TripOverlay {
        TripOverlay::new(PathStyle::new("#DE0416", 5))
    }

    #[test]
    fn test_install_at_index_zero() {
        let mut surface = VecSurface::new();
        surface.append(MapObject::Marker(Marker::new(
            EntityId::from("X"),
            "X",
            GeoPoint::new(0.0, 0.0),
            MarkerStyle::default(),
        )));

        let mut overlay = overlay();
        overlay.install(&mut surface).unwrap();

        assert!(overlay.is_installed());
        assert_eq!(surface.len(), 2);
        assert_eq!(TripOverlay::points(&surface), Some(&[][..]));
        assert_eq!(surface.get(1).unwrap().kind(), "marker");
    }

    #[test]
    fn test_set_path_and_clear() {
        let mut surface = VecSurface::new();
        let mut overlay = overlay();
        overlay.install(&mut surface).unwrap();

        let points = vec![GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)];
        overlay.set_path(&mut surface, points.clone()).unwrap();
        assert_eq!(TripOverlay::points(&surface).unwrap(), points.as_slice());

        overlay.clear(&mut surface).unwrap();
        assert!(TripOverlay::points(&surface).unwrap().is_empty());
        assert_eq!(surface.len(), 1);
    }

    #[test]
    fn test_set_path_without_overlay() {
        let mut surface = VecSurface::new();
        let err = overlay()
            .set_path(&mut surface, vec![GeoPoint::new(1.0, 2.0)])
            .unwrap_err();

        assert!(matches!(err, EngineError::SurfaceMismatch { index: 0, .. }));
    }

    #[test]
    fn test_center_on_first() {
        let mut view = RecordingView::default();

        assert!(!TripOverlay::center_on_first(&mut view, &[], 15));
        assert!(TripOverlay::center_on_first(
            &mut view,
            &[GeoPoint::new(5.0, 6.0), GeoPoint::new(7.0, 8.0)],
            15
        ));
        assert_eq!(view.centered, vec![(GeoPoint::new(5.0, 6.0), 15)]);
    }
}
