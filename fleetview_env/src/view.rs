//! View controls exposed by the embedding UI.

use crate::types::GeoPoint;

/// The side panels whose expansion the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    /// The vehicle list card
    Vehicles,
    /// The driver list card
    Drivers,
}

/// Camera and panel controls.
///
/// All calls are fire-and-forget; the engine never reads view state back.
pub trait ViewControls: Send + 'static {
    /// Centers the map on `point` at `zoom`.
    fn center_view(&mut self, point: GeoPoint, zoom: u8);

    /// Expands or collapses a side panel.
    fn set_panel_expanded(&mut self, panel: Panel, expanded: bool);

    /// Switches between the vehicle card and the driver card.
    fn set_driver_view_visible(&mut self, visible: bool);
}
