//! Engine configuration.

use fleetview_env::{MarkerStyle, PathStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the FleetEngine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Zoom level used whenever the view is centered (default: 15)
    pub zoom_level: u8,

    /// Icon for entity markers
    pub marker_style: MarkerStyle,

    /// Stroke for entity trails (default: green, 5px)
    pub trail_style: PathStyle,

    /// Stroke for the trip playback overlay (default: red, 5px)
    pub trip_style: PathStyle,

    /// Load the whole fleet at startup and track every entity
    pub track_all_on_start: bool,

    /// Save each entity's history to the store after ingestion
    pub persist_locations: bool,

    /// How many recent feed messages to fetch when an entity is first shown
    pub last_location_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zoom_level: 15,
            marker_style: MarkerStyle::default(),
            trail_style: PathStyle::new("#4caf50", 5),
            trip_style: PathStyle::new("#DE0416", 5),
            track_all_on_start: true,
            persist_locations: true,
            last_location_count: 1,
        }
    }
}

impl EngineConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Errors loading an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.zoom_level, 15);
        assert_eq!(config.trail_style.stroke_color, "#4caf50");
        assert_eq!(config.trip_style.stroke_color, "#DE0416");
        assert!(config.track_all_on_start);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(r#"{"zoom_level": 12, "track_all_on_start": false}"#)
            .unwrap();

        assert_eq!(config.zoom_level, 12);
        assert!(!config.track_all_on_start);
        assert_eq!(config.marker_style.width, 40);
        assert_eq!(config.last_location_count, 1);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{zoom"),
            Err(ConfigError::Parse(_))
        ));
    }
}
