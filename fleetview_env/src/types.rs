//! Common types shared between the engine and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Creates an identifier from anything string-like.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Opaque identifier of a tracked vehicle/device (the feed's `from` field).
    EntityId
);
string_id!(
    /// Identifier of a driver record.
    DriverId
);
string_id!(
    /// Identifier of a historical trip.
    TripId
);

/// A bare map coordinate, as used by markers and paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A stored location record.
///
/// `timestamp` (epoch millis) is always present once stored. Every other field
/// may be absent on malformed input; only points with both coordinates are
/// drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub timestamp: i64,
}

impl LocationPoint {
    /// The drawable position of this point, if it has both coordinates.
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    /// True when the record lacks a coordinate.
    pub fn is_malformed(&self) -> bool {
        self.position().is_none()
    }
}

/// A location record as delivered by a collaborator, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl RawLocation {
    /// A fully populated record without a timestamp.
    pub fn new(latitude: f64, longitude: f64, speed: f64, heading: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            speed: Some(speed),
            heading: Some(heading),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamps the record, keeping any timestamp the source supplied.
    pub fn normalize(self, ingestion_millis: i64) -> LocationPoint {
        LocationPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed,
            heading: self.heading,
            timestamp: self.timestamp.unwrap_or(ingestion_millis),
        }
    }
}

impl From<&LocationPoint> for RawLocation {
    fn from(point: &LocationPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            speed: point.speed,
            heading: point.heading,
            timestamp: Some(point.timestamp),
        }
    }
}

/// One message from the live-update feed.
///
/// Wire shape: `{"from": id, "latitude", "longitude", "speed", "heading", "timestamp"?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    pub from: EntityId,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl FeedMessage {
    pub fn new(from: impl Into<EntityId>, location: RawLocation) -> Self {
        Self {
            from: from.into(),
            latitude: location.latitude,
            longitude: location.longitude,
            speed: location.speed,
            heading: location.heading,
            timestamp: location.timestamp,
        }
    }

    /// The location part of the message.
    pub fn location(&self) -> RawLocation {
        RawLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed,
            heading: self.heading,
            timestamp: self.timestamp,
        }
    }
}

/// An entity as persisted by the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub track_on_map: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub locations: Vec<LocationPoint>,
}

fn default_active() -> bool {
    true
}

impl EntityRecord {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            driver_name: None,
            track_on_map: false,
            active: true,
            locations: Vec::new(),
        }
    }
}

/// A driver as persisted by the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub id: DriverId,
    pub name: String,
    /// The vehicle this driver currently drives
    #[serde(default)]
    pub vehicle: Option<EntityId>,
}

/// A historical trip, reduced to the positions of its trip events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: TripId,
    pub driver: DriverId,
    pub events: Vec<GeoPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_message_without_timestamp() {
        let json = r#"{"from":"Z","latitude":1,"longitude":2,"speed":3,"heading":4}"#;
        let msg: FeedMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.from, EntityId::from("Z"));
        assert_eq!(msg.latitude, Some(1.0));
        assert_eq!(msg.heading, Some(4.0));
        assert_eq!(msg.timestamp, None);
    }

    #[test]
    fn test_feed_message_missing_fields_still_parses() {
        let json = r#"{"from":"car-7","latitude":52.1,"timestamp":1700000000000}"#;
        let msg: FeedMessage = serde_json::from_str(json).unwrap();
        let raw = msg.location();

        assert_eq!(raw.longitude, None);
        assert_eq!(raw.speed, None);
        assert_eq!(raw.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_normalize_keeps_source_timestamp() {
        let raw = RawLocation::new(1.0, 2.0, 3.0, 4.0).with_timestamp(42);
        assert_eq!(raw.normalize(9_999).timestamp, 42);
    }

    #[test]
    fn test_normalize_defaults_timestamp() {
        let raw = RawLocation::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(raw.normalize(9_999).timestamp, 9_999);
    }

    #[test]
    fn test_malformed_point_has_no_position() {
        let point = RawLocation {
            latitude: Some(1.0),
            ..Default::default()
        }
        .normalize(0);

        assert!(point.is_malformed());
        assert_eq!(point.position(), None);
    }

    #[test]
    fn test_entity_record_defaults() {
        let json = r#"{"id":"car-1","name":"Van 1"}"#;
        let record: EntityRecord = serde_json::from_str(json).unwrap();

        assert!(record.active);
        assert!(!record.track_on_map);
        assert!(record.locations.is_empty());
    }
}
