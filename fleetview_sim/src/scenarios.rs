//! Fault scenarios for DST.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// DST-001: Track the whole fleet on start, surface ready from frame one
    ColdStart,

    /// DST-002: Random track toggles racing in-flight lookups
    ToggleStorm,

    /// DST-003: Feed and toggles run before the surface attaches
    LateSurface,

    /// DST-004: Messages missing coordinates and timestamps
    DirtyFeed,

    /// DST-005: Feed ids the store does not know
    GhostFleet,

    /// DST-006: Rapid trip selection, only the latest may draw
    TripReplay,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::ColdStart,
            ScenarioId::ToggleStorm,
            ScenarioId::LateSurface,
            ScenarioId::DirtyFeed,
            ScenarioId::GhostFleet,
            ScenarioId::TripReplay,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::ColdStart => "cold_start",
            ScenarioId::ToggleStorm => "toggle_storm",
            ScenarioId::LateSurface => "late_surface",
            ScenarioId::DirtyFeed => "dirty_feed",
            ScenarioId::GhostFleet => "ghost_fleet",
            ScenarioId::TripReplay => "trip_replay",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::ColdStart => "Whole fleet tracked on start, every vehicle must render",
            ScenarioId::ToggleStorm => "20% toggle rate per vehicle per tick, ledger must match surface",
            ScenarioId::LateSurface => "Surface attaches halfway through, backlog must reconcile",
            ScenarioId::DirtyFeed => "10% malformed and 10% untimed messages, no crash, all counted",
            ScenarioId::GhostFleet => "30% of vehicles unknown to the store, rendering via live feed",
            ScenarioId::TripReplay => "Trip selections every tick, overlay shows only the latest",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cold_start" | "coldstart" | "dst-001" => Ok(ScenarioId::ColdStart),
            "toggle_storm" | "togglestorm" | "dst-002" => Ok(ScenarioId::ToggleStorm),
            "late_surface" | "latesurface" | "dst-003" => Ok(ScenarioId::LateSurface),
            "dirty_feed" | "dirtyfeed" | "dst-004" => Ok(ScenarioId::DirtyFeed),
            "ghost_fleet" | "ghostfleet" | "dst-005" => Ok(ScenarioId::GhostFleet),
            "trip_replay" | "tripreplay" | "dst-006" => Ok(ScenarioId::TripReplay),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
