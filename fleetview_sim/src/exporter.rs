//! JSON exporter for simulation runs.
//!
//! Exports per-tick frames so a run can be replayed or plotted offline.

use fleetview_env::{EntityId, GeoPoint};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Ground truth vehicle positions
    pub vehicles: Vec<VehiclePosition>,

    /// What the map shows, in surface order
    pub rendered: Vec<RenderedEntity>,

    /// Size of the desired tracked set
    pub desired: usize,

    /// Objects on the surface, overlay included
    pub surface_len: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// True position of a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehiclePosition {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl VehiclePosition {
    pub fn new(id: &EntityId, point: GeoPoint) -> Self {
        Self {
            id: id.to_string(),
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

/// A marker/trail pair as drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedEntity {
    pub id: String,
    pub marker_index: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub trail_points: usize,
}

/// Simulation event (toggles, surface attach, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
