//! Selection state: the highlighted entity, the highlighted driver, the
//! requested trip and which side card is visible.
//!
//! A new selection silently replaces the previous one. View side effects are
//! emitted here; overlay changes are left to the engine.

use fleetview_env::{DriverId, EntityId, GeoPoint, Panel, TripId, ViewControls};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    selected_entity: Option<EntityId>,
    selected_driver: Option<DriverId>,
    trip_request: Option<TripId>,
    driver_view_visible: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_entity(&self) -> Option<&EntityId> {
        self.selected_entity.as_ref()
    }

    pub fn selected_driver(&self) -> Option<&DriverId> {
        self.selected_driver.as_ref()
    }

    pub fn trip_request(&self) -> Option<&TripId> {
        self.trip_request.as_ref()
    }

    pub fn driver_view_visible(&self) -> bool {
        self.driver_view_visible
    }

    /// Selects an entity, centering on `latest` when it is known.
    ///
    /// Any pending trip request belonged to the previous selection and is
    /// dropped.
    pub fn select_entity<V: ViewControls + ?Sized>(
        &mut self,
        id: EntityId,
        latest: Option<GeoPoint>,
        view: &mut V,
        zoom: u8,
    ) {
        if let Some(point) = latest {
            view.center_view(point, zoom);
        }
        view.set_panel_expanded(Panel::Vehicles, true);
        self.selected_entity = Some(id);
        self.trip_request = None;
    }

    /// Clears the entity selection. Returns the entity that was selected.
    pub fn deselect_entity<V: ViewControls + ?Sized>(&mut self, view: &mut V) -> Option<EntityId> {
        view.set_panel_expanded(Panel::Vehicles, false);
        self.trip_request = None;
        self.selected_entity.take()
    }

    pub fn select_driver<V: ViewControls + ?Sized>(&mut self, id: DriverId, view: &mut V) {
        view.set_panel_expanded(Panel::Drivers, true);
        self.selected_driver = Some(id);
    }

    pub fn deselect_driver<V: ViewControls + ?Sized>(&mut self, view: &mut V) -> Option<DriverId> {
        view.set_panel_expanded(Panel::Drivers, false);
        self.selected_driver.take()
    }

    /// True if `id` is still the selected driver.
    pub fn is_selected_driver(&self, id: &DriverId) -> bool {
        self.selected_driver.as_ref() == Some(id)
    }

    /// Records `id` as the latest trip request.
    pub fn request_trip(&mut self, id: TripId) {
        self.trip_request = Some(id);
    }

    /// True if `id` is the latest trip request and it has not been cancelled.
    pub fn is_current_trip(&self, id: &TripId) -> bool {
        self.trip_request.as_ref() == Some(id)
    }

    /// Flips between the vehicle card and the driver card.
    pub fn toggle_driver_view<V: ViewControls + ?Sized>(&mut self, view: &mut V) -> bool {
        self.driver_view_visible = !self.driver_view_visible;
        view.set_driver_view_visible(self.driver_view_visible);
        self.driver_view_visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingView {
        centered: Vec<GeoPoint>,
        panels: Vec<(Panel, bool)>,
        driver_view: Vec<bool>,
    }

    impl ViewControls for RecordingView {
        fn center_view(&mut self, point: GeoPoint, _zoom: u8) {
            self.centered.push(point);
        }
        fn set_panel_expanded(&mut self, panel: Panel, expanded: bool) {
            self.panels.push((panel, expanded));
        }
        fn set_driver_view_visible(&mut self, visible: bool) {
            self.driver_view.push(visible);
        }
    }

    #[test]
    fn test_select_entity_centers_and_expands() {
        let mut view = RecordingView::default();
        let mut selection = SelectionState::new();

        selection.select_entity(EntityId::from("car-1"), Some(GeoPoint::new(1.0, 2.0)), &mut view, 15);

        assert_eq!(selection.selected_entity(), Some(&EntityId::from("car-1")));
        assert_eq!(view.centered, vec![GeoPoint::new(1.0, 2.0)]);
        assert_eq!(view.panels, vec![(Panel::Vehicles, true)]);
    }

    #[test]
    fn test_select_without_location_does_not_center() {
        let mut view = RecordingView::default();
        let mut selection = SelectionState::new();

        selection.select_entity(EntityId::from("car-1"), None, &mut view, 15);

        assert!(view.centered.is_empty());
        assert_eq!(view.panels, vec![(Panel::Vehicles, true)]);
    }

    #[test]
    fn test_new_selection_replaces_old_and_drops_trip() {
        let mut view = RecordingView::default();
        let mut selection = SelectionState::new();
        selection.select_entity(EntityId::from("a"), None, &mut view, 15);
        selection.request_trip(TripId::from("t1"));

        selection.select_entity(EntityId::from("b"), None, &mut view, 15);

        assert_eq!(selection.selected_entity(), Some(&EntityId::from("b")));
        assert!(!selection.is_current_trip(&TripId::from("t1")));
    }

    #[test]
    fn test_deselect_collapses_and_cancels_trip() {
        let mut view = RecordingView::default();
        let mut selection = SelectionState::new();
        selection.select_entity(EntityId::from("a"), None, &mut view, 15);
        selection.request_trip(TripId::from("t1"));

        let previous = selection.deselect_entity(&mut view);

        assert_eq!(previous, Some(EntityId::from("a")));
        assert!(selection.trip_request().is_none());
        assert_eq!(view.panels.last(), Some(&(Panel::Vehicles, false)));
    }

    #[test]
    fn test_latest_trip_request_wins() {
        let mut selection = SelectionState::new();
        selection.request_trip(TripId::from("t1"));
        selection.request_trip(TripId::from("t2"));

        assert!(!selection.is_current_trip(&TripId::from("t1")));
        assert!(selection.is_current_trip(&TripId::from("t2")));
    }

    #[test]
    fn test_driver_selection() {
        let mut view = RecordingView::default();
        let mut selection = SelectionState::new();

        selection.select_driver(DriverId::from("d1"), &mut view);
        assert!(selection.is_selected_driver(&DriverId::from("d1")));
        selection.select_driver(DriverId::from("d2"), &mut view);
        assert!(!selection.is_selected_driver(&DriverId::from("d1")));

        selection.deselect_driver(&mut view);
        assert!(selection.selected_driver().is_none());
        assert_eq!(view.panels.last(), Some(&(Panel::Drivers, false)));
    }

    #[test]
    fn test_toggle_driver_view() {
        let mut view = RecordingView::default();
        let mut selection = SelectionState::new();

        assert!(selection.toggle_driver_view(&mut view));
        assert!(!selection.toggle_driver_view(&mut view));
        assert_eq!(view.driver_view, vec![true, false]);
    }
}
