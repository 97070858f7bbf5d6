//! Scenario runner - executes fault-injection scenarios against the engine.

use crate::error::SimError;
use crate::exporter::{SimEvent, SimExport};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use fleetview_core::{EngineConfig, EngineEvent, EngineStats, TripOverlay};
use fleetview_env::{DisplaySurface, GeoPoint, TripId};
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Number of rendered entities at end
    pub final_entity_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Frame-by-frame trace, when export was requested
    pub export: Option<SimExport>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Feed messages published
    pub readings_published: u64,

    /// Track toggles sent
    pub toggles: u64,

    /// Engine counters at the end of the run
    pub engine: EngineStats,
}

/// Runs fault scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of vehicles
    num_vehicles: usize,

    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Maximum duration in seconds
    max_duration_secs: f64,

    /// Base engine configuration; scenarios override the startup mode
    engine_config: EngineConfig,

    /// Record a frame per tick
    export: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_vehicles: usize) -> Self {
        Self {
            seed,
            num_vehicles,
            tick_rate_hz: 10,
            max_duration_secs: 10.0,
            engine_config: EngineConfig::default(),
            export: false,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Records a frame per tick into [`ScenarioResult::export`].
    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    /// Runs a scenario and returns the result.
    ///
    /// Each run gets its own single-threaded runtime so task interleaving is
    /// a function of the seed alone.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => return self.aborted(scenario, SimError::Runtime(e)),
        };

        runtime.block_on(self.run_async(scenario))
    }

    async fn run_async(&self, scenario: ScenarioId) -> ScenarioResult {
        let (sim_config, engine_config) = self.configure(scenario);
        let mut world = SimWorld::new(sim_config, engine_config);
        let mut export = self
            .export
            .then(|| SimExport::new(scenario.name(), self.seed));

        let outcome = match scenario {
            ScenarioId::ColdStart => self.run_cold_start(&mut world, &mut export).await,
            ScenarioId::ToggleStorm => self.run_toggle_storm(&mut world, &mut export).await,
            ScenarioId::LateSurface => self.run_late_surface(&mut world, &mut export).await,
            ScenarioId::DirtyFeed => self.run_dirty_feed(&mut world, &mut export).await,
            ScenarioId::GhostFleet => self.run_ghost_fleet(&mut world, &mut export).await,
            ScenarioId::TripReplay => self.run_trip_replay(&mut world, &mut export).await,
        };

        // Every scenario must end converged after one clean round.
        let outcome = match outcome {
            Ok(()) => Self::finish(&mut world).await,
            Err(e) => Err(e),
        };

        let failure_reason = outcome.err().map(|e| e.to_string());
        let passed = failure_reason.is_none();
        if let Some(export) = export.as_mut() {
            export.add_frame(world.snapshot());
            export.finalize(passed, failure_reason.clone());
        }

        let stats = world.engine.stats().clone();
        info!(
            "{} {}: {} renders, {} moves, {} removals, {} lookups",
            if passed { "✓" } else { "✗" },
            scenario.name(),
            stats.renders,
            stats.moves,
            stats.removals,
            stats.lookups_spawned
        );

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: world.tick_count(),
            final_time_secs: world.time_secs(),
            final_entity_count: world.engine.rendered_ids().len(),
            failure_reason,
            metrics: ScenarioMetrics {
                readings_published: world.feed.published(),
                toggles: world.toggles(),
                engine: stats,
            },
            export,
        }
    }

    fn configure(&self, scenario: ScenarioId) -> (SimConfig, EngineConfig) {
        let mut sim = SimConfig {
            seed: self.seed,
            num_vehicles: self.num_vehicles,
            tick_rate_hz: self.tick_rate_hz,
            max_duration_secs: self.max_duration_secs,
            ..SimConfig::default()
        };
        let mut engine = self.engine_config.clone();
        engine.track_all_on_start = false;

        match scenario {
            ScenarioId::ColdStart => engine.track_all_on_start = true,
            ScenarioId::ToggleStorm => sim.toggle_probability = 0.2,
            ScenarioId::LateSurface => {
                engine.track_all_on_start = true;
                sim.toggle_probability = 0.05;
            }
            ScenarioId::DirtyFeed => {
                engine.track_all_on_start = true;
                sim.malformed_rate = 0.1;
                sim.missing_timestamp_rate = 0.1;
            }
            ScenarioId::GhostFleet => {
                sim.lookup_miss_rate = 0.3;
                sim.toggle_probability = 0.05;
            }
            ScenarioId::TripReplay => engine.track_all_on_start = true,
        }
        (sim, engine)
    }

    /// DST-001: ColdStart - whole fleet tracked from the first frame.
    ///
    /// **Assertion**: every vehicle is rendered, one marker/trail pair each.
    async fn run_cold_start(
        &self,
        world: &mut SimWorld,
        export: &mut Option<SimExport>,
    ) -> Result<(), SimError> {
        info!("DST-001: ColdStart - track all on start");

        world.attach_surface()?;
        world.start();
        world.settle().await;

        for tick in 0..world.target_ticks() {
            world.step().await;
            world.audit()?;
            Self::record(world, export, Vec::new());
            self.progress(world, tick);
        }

        world.clean_round().await;
        let rendered = world.engine.rendered_ids().len();
        if rendered != self.num_vehicles {
            return Err(SimError::Divergence(format!(
                "{} of {} vehicles rendered",
                rendered, self.num_vehicles
            )));
        }
        Ok(())
    }

    /// DST-002: ToggleStorm - toggles race lookups every tick.
    ///
    /// **Assertion**: the ledger matches the surface after every frame.
    async fn run_toggle_storm(
        &self,
        world: &mut SimWorld,
        export: &mut Option<SimExport>,
    ) -> Result<(), SimError> {
        info!("DST-002: ToggleStorm - random track toggles");

        world.attach_surface()?;
        world.start();

        for tick in 0..world.target_ticks() {
            world.step().await;
            let toggled = world.random_toggles()?;
            // Half the time, let a toggle burst share a frame with feed traffic.
            if world.chance(0.5) {
                world.step().await;
            } else {
                world.settle().await;
            }
            world.audit()?;

            let events = if toggled > 0 {
                vec![SimEvent::info(format!("{} toggles", toggled))]
            } else {
                Vec::new()
            };
            Self::record(world, export, events);
            self.progress(world, tick);
        }
        Ok(())
    }

    /// DST-003: LateSurface - feed and toggles arrive before the map exists.
    ///
    /// **Assertion**: nothing is drawn without a surface, and the backlog
    /// reconciles once it attaches.
    async fn run_late_surface(
        &self,
        world: &mut SimWorld,
        export: &mut Option<SimExport>,
    ) -> Result<(), SimError> {
        info!("DST-003: LateSurface - surface attaches late");

        world.start();
        world.settle().await;

        let attach_at = world.target_ticks() / 2;
        let mut attached = false;
        for tick in 0..world.target_ticks() {
            let mut events = Vec::new();
            if tick == attach_at {
                Self::check_nothing_drawn(world)?;
                info!("  ⚡ Attaching surface at t={:.1}s", world.time_secs());
                world.attach_surface()?;
                attached = true;
                events.push(SimEvent::info("surface attached"));
            }

            world.step().await;
            world.random_toggles()?;
            world.settle().await;
            world.audit()?;
            Self::record(world, export, events);
            self.progress(world, tick);
        }

        if !attached {
            Self::check_nothing_drawn(world)?;
            world.attach_surface()?;
            world.settle().await;
        }
        Ok(())
    }

    fn check_nothing_drawn(world: &SimWorld) -> Result<(), SimError> {
        if !world.engine.ledger().is_empty() {
            return Err(SimError::Invariant(
                "entities rendered before the surface attached".to_string(),
            ));
        }
        if world.engine.stats().surface_unavailable == 0 {
            return Err(SimError::Invariant(
                "reconcile without a surface went unreported".to_string(),
            ));
        }
        Ok(())
    }

    /// DST-004: DirtyFeed - records missing coordinates and timestamps.
    ///
    /// **Assertion**: every defect is counted and rendering still converges.
    async fn run_dirty_feed(
        &self,
        world: &mut SimWorld,
        export: &mut Option<SimExport>,
    ) -> Result<(), SimError> {
        info!("DST-004: DirtyFeed - malformed and untimed messages");

        world.attach_surface()?;
        world.start();
        world.settle().await;

        for tick in 0..world.target_ticks() {
            world.step().await;
            world.audit()?;
            Self::record(world, export, Vec::new());
            self.progress(world, tick);
        }

        let stats = world.engine.stats();
        let malformed = world.oracle.malformed_generated();
        let untimed = world.oracle.missing_timestamps_generated();
        if stats.malformed_locations < malformed {
            return Err(SimError::Invariant(format!(
                "{} malformed messages sent, {} counted",
                malformed, stats.malformed_locations
            )));
        }
        if stats.defaulted_timestamps < untimed {
            return Err(SimError::Invariant(format!(
                "{} untimed messages sent, {} defaulted",
                untimed, stats.defaulted_timestamps
            )));
        }
        info!(
            "  Injected {} malformed / {} untimed, engine counted {} / {}",
            malformed, untimed, stats.malformed_locations, stats.defaulted_timestamps
        );
        Ok(())
    }

    /// DST-005: GhostFleet - part of the fleet is unknown to the store.
    ///
    /// **Assertion**: lookups miss without side effects, and wanted ghosts
    /// still render from the live feed.
    async fn run_ghost_fleet(
        &self,
        world: &mut SimWorld,
        export: &mut Option<SimExport>,
    ) -> Result<(), SimError> {
        info!("DST-005: GhostFleet - lookups that miss");

        world.attach_surface()?;
        world.start();

        let ghosts = world
            .vehicle_ids()
            .into_iter()
            .filter(|id| world.store.is_hidden(id))
            .count();
        info!("  {} of {} vehicles hidden from the store", ghosts, self.num_vehicles);

        for id in world.vehicle_ids() {
            world.toggle(id)?;
        }
        world.settle().await;

        for tick in 0..world.target_ticks() {
            world.step().await;
            world.random_toggles()?;
            world.settle().await;
            world.audit()?;
            Self::record(world, export, Vec::new());
            self.progress(world, tick);
        }

        if ghosts > 0 && world.engine.stats().lookup_misses == 0 {
            return Err(SimError::Invariant(
                "lookups for hidden vehicles never missed".to_string(),
            ));
        }
        Ok(())
    }

    /// DST-006: TripReplay - several trip selections per frame.
    ///
    /// **Assertion**: the overlay only ever shows the latest request.
    async fn run_trip_replay(
        &self,
        world: &mut SimWorld,
        export: &mut Option<SimExport>,
    ) -> Result<(), SimError> {
        info!("DST-006: TripReplay - superseded trip requests");

        world.attach_surface()?;
        world.start();
        world.settle().await;

        let trips: Vec<TripId> = world.oracle.vehicles().iter().map(|v| v.trip.clone()).collect();
        for tick in 0..world.target_ticks() {
            world.step().await;

            let mut events = Vec::new();
            for _ in 0..3 {
                if let Some(i) = world.random_vehicle_index() {
                    world.send(EngineEvent::SelectTrip(trips[i].clone()))?;
                }
            }
            if world.chance(0.2) {
                if let Some(i) = world.random_vehicle_index() {
                    let id = world.vehicle_ids()[i].clone();
                    world.send(EngineEvent::SelectEntity(id))?;
                    events.push(SimEvent::info("entity selected"));
                }
            }
            world.settle().await;

            world.audit()?;
            Self::check_overlay(world)?;
            Self::record(world, export, events);
            self.progress(world, tick);
        }

        if !trips.is_empty() && world.target_ticks() > 0 && world.engine.stats().stale_trips == 0 {
            warn!("No trip resolution was superseded");
        }
        Ok(())
    }

    fn check_overlay(world: &SimWorld) -> Result<(), SimError> {
        let Some(surface) = world.engine.surface() else {
            return Ok(());
        };
        let shown = TripOverlay::points(surface).unwrap_or_default();
        let expected: Vec<GeoPoint> = world
            .engine
            .selection()
            .trip_request()
            .and_then(|id| world.store.trip(id))
            .map(|trip| trip.events)
            .unwrap_or_default();

        if shown != expected.as_slice() {
            return Err(SimError::Invariant(format!(
                "overlay shows {} points, current trip has {}",
                shown.len(),
                expected.len()
            )));
        }
        Ok(())
    }

    async fn finish(world: &mut SimWorld) -> Result<(), SimError> {
        world.clean_round().await;
        world.audit()?;
        world.check_convergence()
    }

    fn record(world: &SimWorld, export: &mut Option<SimExport>, events: Vec<SimEvent>) {
        if let Some(export) = export.as_mut() {
            let mut frame = world.snapshot();
            frame.events = events;
            export.add_frame(frame);
        }
    }

    fn progress(&self, world: &SimWorld, tick: u64) {
        if tick % self.tick_rate_hz.max(1) as u64 == 0 {
            debug!(
                "  t={:.1}s | desired={} | rendered={} | surface={}",
                world.time_secs(),
                world.engine.desired_ids().len(),
                world.engine.rendered_ids().len(),
                world.engine.surface().map(|s| s.len()).unwrap_or(0)
            );
        }
    }

    fn aborted(&self, scenario: ScenarioId, error: SimError) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            final_entity_count: 0,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
            export: None,
        }
    }
}
