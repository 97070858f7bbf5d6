//! Recording view controls.

use fleetview_env::{GeoPoint, Panel, ViewControls};
use std::collections::HashMap;

/// Records every view call the engine makes.
#[derive(Debug, Default, Clone)]
pub struct SimView {
    /// Every centering, oldest first
    pub centered: Vec<(GeoPoint, u8)>,
    pub panels: HashMap<Panel, bool>,
    pub driver_view_visible: bool,
}

impl SimView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_center(&self) -> Option<GeoPoint> {
        self.centered.last().map(|(point, _)| *point)
    }

    pub fn is_expanded(&self, panel: Panel) -> bool {
        self.panels.get(&panel).copied().unwrap_or(false)
    }
}

impl ViewControls for SimView {
    fn center_view(&mut self, point: GeoPoint, zoom: u8) {
        self.centered.push((point, zoom));
    }

    fn set_panel_expanded(&mut self, panel: Panel, expanded: bool) {
        self.panels.insert(panel, expanded);
    }

    fn set_driver_view_visible(&mut self, visible: bool) {
        self.driver_view_visible = visible;
    }
}
