//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{RenderedEntity, SimFrame, VehiclePosition};
use crate::feed::{sim_feed, SimFeedController};
use crate::oracle::Oracle;
use crate::store::SimStore;
use crate::view::SimView;

use fleetview_core::{EngineConfig, EngineEvent, FleetEngine, OVERLAY_INDEX};
use fleetview_env::{
    DisplaySurface, EntityId, EntityStore, FeedMessage, FleetViewContext, MapObject, VecSurface,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// The engine as wired up by the harness.
pub type SimEngine = FleetEngine<SimContext, VecSurface, SimView>;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of vehicles in the fleet
    pub num_vehicles: usize,

    /// Tick rate in Hz (one feed message per vehicle per tick)
    pub tick_rate_hz: u32,

    /// Maximum simulation duration in seconds
    pub max_duration_secs: f64,

    /// Per-vehicle, per-tick probability of a track toggle
    pub toggle_probability: f64,

    /// Fraction of feed messages missing a coordinate
    pub malformed_rate: f64,

    /// Fraction of feed messages missing a timestamp
    pub missing_timestamp_rate: f64,

    /// Fraction of vehicles the store does not know
    pub lookup_miss_rate: f64,

    /// GPS noise standard deviation (metres)
    pub sensor_noise_std: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_vehicles: 10,
            tick_rate_hz: 10,
            max_duration_secs: 10.0,
            toggle_probability: 0.0,
            malformed_rate: 0.0,
            missing_timestamp_rate: 0.0,
            lookup_miss_rate: 0.0,
            sensor_noise_std: 3.0,
        }
    }
}

/// The SimWorld - container for the entire simulation.
pub struct SimWorld {
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    /// Ground truth oracle
    pub oracle: Oracle,

    pub store: Arc<SimStore>,

    /// Publishing side of the live feed
    pub feed: SimFeedController,

    pub engine: SimEngine,

    /// RNG for simulated user actions
    action_rng: ChaCha8Rng,

    tick_count: u64,
    toggles: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig, engine_config: EngineConfig) -> Self {
        // Derive separate seeds for different subsystems
        let context_seed = config.seed;
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let action_seed = config.seed.wrapping_mul(0x517cc1b727220a95);

        let context = SimContext::shared(context_seed);

        let mut oracle = Oracle::new(physics_seed);
        oracle.set_position_noise(config.sensor_noise_std);
        oracle.spawn_fleet(config.num_vehicles);

        let mut action_rng = ChaCha8Rng::seed_from_u64(action_seed);
        let store = Arc::new(SimStore::new());
        for vehicle in oracle.vehicles() {
            store.insert_record(vehicle.record());
            store.insert_driver(vehicle.driver_record());
            if action_rng.gen::<f64>() < config.lookup_miss_rate {
                store.hide(vehicle.id.clone());
            }
        }
        for trip in oracle.trips() {
            store.insert_trip(trip.clone());
        }

        let (feed, feed_controller) = sim_feed();
        let engine = FleetEngine::new(
            Arc::clone(&context),
            Arc::clone(&store) as Arc<dyn EntityStore>,
            Arc::new(feed),
            SimView::new(),
            engine_config,
        );

        Self {
            config,
            context,
            oracle,
            store,
            feed: feed_controller,
            engine,
            action_rng,
            tick_count: 0,
            toggles: 0,
        }
    }

    /// Starts the engine (feed subscription and, if configured, fleet load).
    pub fn start(&mut self) {
        self.engine.start();
    }

    pub fn attach_surface(&mut self) -> Result<(), SimError> {
        self.engine.attach_surface(VecSurface::new())?;
        Ok(())
    }

    /// Seconds per tick.
    pub fn dt(&self) -> f64 {
        1.0 / self.config.tick_rate_hz.max(1) as f64
    }

    /// Ticks needed to cover the configured duration.
    pub fn target_ticks(&self) -> u64 {
        (self.config.max_duration_secs * self.config.tick_rate_hz as f64) as u64
    }

    /// Advances physics one tick, publishes one message per vehicle and lets
    /// the engine catch up.
    pub async fn step(&mut self) {
        let dt = self.dt();
        self.oracle.step(dt);
        self.context.advance_time(Duration::from_secs_f64(dt));

        let now = self.context.epoch_millis();
        let messages = self.oracle.generate_messages(
            self.config.malformed_rate,
            self.config.missing_timestamp_rate,
            now,
        );
        self.publish(messages);
        self.tick_count += 1;
        self.engine.settle().await;
    }

    /// Publishes one defect-free message per vehicle and settles.
    pub async fn clean_round(&mut self) {
        let now = self.context.epoch_millis();
        let messages = self.oracle.generate_messages(0.0, 0.0, now);
        self.publish(messages);
        self.engine.settle().await;
    }

    fn publish(&mut self, messages: Vec<FeedMessage>) {
        for message in messages {
            self.feed.publish(message);
        }
    }

    pub async fn settle(&mut self) {
        self.engine.settle().await;
    }

    pub fn send(&self, event: EngineEvent) -> Result<(), SimError> {
        self.engine.handle().send(event)?;
        Ok(())
    }

    pub fn toggle(&mut self, id: EntityId) -> Result<(), SimError> {
        self.send(EngineEvent::ToggleTrack(id))?;
        self.toggles += 1;
        Ok(())
    }

    /// Toggles each vehicle with the configured probability.
    pub fn random_toggles(&mut self) -> Result<usize, SimError> {
        let mut count = 0;
        for i in 0..self.oracle.vehicles().len() {
            if self.action_rng.gen::<f64>() < self.config.toggle_probability {
                let id = self.oracle.vehicles()[i].id.clone();
                self.toggle(id)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Picks a vehicle index using the action RNG.
    pub fn random_vehicle_index(&mut self) -> Option<usize> {
        match self.oracle.vehicles().len() {
            0 => None,
            n => Some(self.action_rng.gen_range(0..n)),
        }
    }

    /// Draws from the action RNG.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.action_rng.gen::<f64>() < probability
    }

    pub fn vehicle_ids(&self) -> Vec<EntityId> {
        self.oracle.vehicles().iter().map(|v| v.id.clone()).collect()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn toggles(&self) -> u64 {
        self.toggles
    }

    pub fn time_secs(&self) -> f64 {
        self.oracle.time()
    }

    /// Ids the engine should have on the surface once quiet: every desired
    /// entity with at least one drawable point.
    pub fn expected_rendered(&self) -> HashSet<EntityId> {
        self.engine
            .desired_ids()
            .into_iter()
            .filter(|id| {
                self.engine
                    .history(id)
                    .and_then(|history| history.latest_position())
                    .is_some()
            })
            .collect()
    }

    /// Checks ledger/surface agreement.
    ///
    /// The surface must hold exactly the overlay plus one marker/trail pair
    /// per ledger entry, each at the indices the ledger records.
    pub fn audit(&self) -> Result<(), SimError> {
        let ledger = self.engine.ledger();
        let Some(surface) = self.engine.surface() else {
            if ledger.is_empty() {
                return Ok(());
            }
            return Err(SimError::Invariant(format!(
                "{} ledger entries without a surface",
                ledger.len()
            )));
        };

        if let Some(violation) = ledger.validate(surface.len()).first() {
            return Err(SimError::Invariant(format!("{:?}", violation)));
        }

        match surface.get(OVERLAY_INDEX) {
            Some(MapObject::Path(path)) if path.owner.is_none() => {}
            other => {
                return Err(SimError::Invariant(format!(
                    "index {} holds {} instead of the overlay",
                    OVERLAY_INDEX,
                    other.map(MapObject::kind).unwrap_or("nothing")
                )))
            }
        }

        let expected_len = 1 + 2 * ledger.len();
        if surface.len() != expected_len {
            return Err(SimError::Invariant(format!(
                "surface holds {} objects, ledger accounts for {}",
                surface.len(),
                expected_len
            )));
        }

        for entry in ledger.entries() {
            let marker_ok = matches!(
                surface.get(entry.marker_index),
                Some(MapObject::Marker(marker)) if marker.owner == entry.entity_id
            );
            let trail_ok = matches!(
                surface.get(entry.trail_index),
                Some(MapObject::Path(trail)) if trail.owner.as_ref() == Some(&entry.entity_id)
            );
            if !(marker_ok && trail_ok) {
                return Err(SimError::Invariant(format!(
                    "{} does not own indices ({}, {})",
                    entry.entity_id, entry.marker_index, entry.trail_index
                )));
            }
        }
        Ok(())
    }

    /// Checks that rendered ids match [`expected_rendered`](Self::expected_rendered).
    pub fn check_convergence(&self) -> Result<(), SimError> {
        if self.engine.pending_lookups() > 0 {
            return Err(SimError::Divergence(format!(
                "{} lookups still in flight",
                self.engine.pending_lookups()
            )));
        }

        let rendered = self.engine.rendered_ids();
        let expected = self.expected_rendered();
        if rendered != expected {
            return Err(SimError::Divergence(format!(
                "{} wanted but not rendered, {} rendered but not wanted",
                expected.difference(&rendered).count(),
                rendered.difference(&expected).count()
            )));
        }
        Ok(())
    }

    /// Captures the current state for export.
    pub fn snapshot(&self) -> SimFrame {
        let vehicles = self
            .oracle
            .ground_truth_positions()
            .into_iter()
            .map(|(id, point)| VehiclePosition::new(&id, point))
            .collect();

        let mut rendered: Vec<RenderedEntity> = match self.engine.surface() {
            Some(surface) => self
                .engine
                .ledger()
                .entries()
                .filter_map(|entry| {
                    let marker = surface.get(entry.marker_index)?.as_marker()?;
                    let trail = surface.get(entry.trail_index)?.as_path()?;
                    Some(RenderedEntity {
                        id: entry.entity_id.to_string(),
                        marker_index: entry.marker_index,
                        latitude: marker.location.latitude,
                        longitude: marker.location.longitude,
                        trail_points: trail.locations().len(),
                    })
                })
                .collect(),
            None => Vec::new(),
        };
        rendered.sort_by_key(|r| r.marker_index);

        SimFrame {
            time_sec: self.oracle.time(),
            vehicles,
            rendered,
            desired: self.engine.desired_ids().len(),
            surface_len: self.engine.surface().map(|s| s.len()).unwrap_or(0),
            events: Vec::new(),
        }
    }
}
