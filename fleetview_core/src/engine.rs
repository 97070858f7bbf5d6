//! FleetEngine - the event-driven runtime that owns all synchronization state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        FleetEngine                          │
//! │                                                             │
//! │   feed pump ──┐                                             │
//! │   user    ────┼──► EngineEvent queue ──► handle() ──┐       │
//! │   lookups ────┘      (unbounded mpsc)               │       │
//! │      ▲                                              ▼       │
//! │      │                                  end_frame(): at     │
//! │      └──── Ctx::spawn ◄──── reconcile ◄── most one pass     │
//! │                                                             │
//! │   FleetRegistry  DesiredTrackedSet  EntityIndexLedger       │
//! │   SelectionState TripOverlay        DisplaySurface          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! One *frame* is a blocking receive followed by draining everything already
//! queued. Desired-set changes only raise a flag; the reconcile pass runs once
//! at the end of the frame, so a burst of toggles coalesces into one pass.
//!
//! Every collaborator call (lookups, trip and driver fetches, saves, fleet
//! load) is spawned through the context and posts its result back onto the
//! queue. Handlers are the error boundary: failures are logged and counted,
//! never propagated.
//!
//! # Usage
//!
//! ```ignore
//! use fleetview_core::{EngineConfig, FleetEngine};
//! use fleetview_env::{TokioContext, VecSurface};
//!
//! let mut engine = FleetEngine::new(TokioContext::shared(), store, feed, view, EngineConfig::default());
//! engine.start();
//! engine.attach_surface(VecSurface::new())?;
//! engine.run().await;
//! ```

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fleet::{FleetRegistry, LocationHistory};
use crate::ingest::{IngestEffect, IngestReport, LocationEventProcessor};
use crate::ledger::EntityIndexLedger;
use crate::reconciler::{DesiredTrackedSet, ResolveOutcome, TrackedSetReconciler};
use crate::selection::SelectionState;
use crate::stats::EngineStats;
use crate::trip_overlay::TripOverlay;
use crate::updater::MarkerTrailUpdater;
use fleetview_env::{
    DisplaySurface, DriverId, DriverRecord, EntityId, EntityRecord, EntityStore, EnvError,
    FeedMessage, FleetViewContext, GeoPoint, LocationFeed, MapObject, RawLocation, TripId,
    TripRecord, ViewControls,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Consecutive empty polls before `settle` gives up waiting for spawned work.
const SETTLE_IDLE_ROUNDS: usize = 4;

/// Everything the engine reacts to.
#[derive(Debug)]
pub enum EngineEvent {
    /// A live location message
    Location(FeedMessage),

    /// Flip an entity's membership in the desired tracked set
    ToggleTrack(EntityId),
    SelectEntity(EntityId),
    DeselectEntity,
    /// Play back a historical trip on the overlay
    SelectTrip(TripId),
    SelectDriver(DriverId),
    DeselectDriver,
    ToggleDriverView,
    /// The surface object at this index was clicked
    MarkerClicked(usize),

    /// Startup fleet load finished
    FleetLoaded(Result<Vec<EntityRecord>, EnvError>),
    /// An entity lookup finished, with the entity's freshest feed messages
    LookupResolved {
        id: EntityId,
        result: Result<Option<EntityRecord>, EnvError>,
        recent: Result<Vec<FeedMessage>, EnvError>,
    },
    TripResolved {
        id: TripId,
        result: Result<Option<TripRecord>, EnvError>,
    },
    DriverResolved {
        id: DriverId,
        result: Result<Option<DriverRecord>, EnvError>,
    },
    DriverTripsResolved {
        id: DriverId,
        result: Result<Vec<TripRecord>, EnvError>,
    },
    /// Re-query the store for active entities
    RefreshActive,
    ActiveLoaded(Result<Vec<EntityRecord>, EnvError>),
    /// A spawned save failed
    SaveFailed { id: EntityId, error: EnvError },
    /// The live feed closed
    FeedClosed,

    Shutdown,
}

/// Cloneable sender for posting events to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    pub fn send(&self, event: EngineEvent) -> Result<(), EngineError> {
        self.tx
            .send(event)
            .map_err(|_| EngineError::Env(EnvError::Closed))
    }

    pub fn toggle_track(&self, id: impl Into<EntityId>) -> Result<(), EngineError> {
        self.send(EngineEvent::ToggleTrack(id.into()))
    }

    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.send(EngineEvent::Shutdown)
    }
}

/// The live fleet synchronization engine.
///
/// Generic over the context, surface and view so the same engine runs in
/// production (tokio, real map) and in simulation (virtual clock, in-memory
/// surface).
pub struct FleetEngine<Ctx, Surf, View>
where
    Ctx: FleetViewContext,
    Surf: DisplaySurface,
    View: ViewControls,
{
    context: Arc<Ctx>,
    store: Arc<dyn EntityStore>,
    feed: Arc<dyn LocationFeed>,
    /// `None` until the embedding UI hands over its map
    surface: Option<Surf>,
    view: View,
    config: EngineConfig,

    fleet: FleetRegistry,
    desired: DesiredTrackedSet,
    ledger: EntityIndexLedger,
    selection: SelectionState,
    overlay: TripOverlay,
    updater: MarkerTrailUpdater,
    reconciler: TrackedSetReconciler,

    /// Trips of the selected driver, once fetched
    driver_trips: Vec<TripRecord>,
    /// Last answer of the store's active-entity query
    active: Vec<EntityRecord>,

    /// Ids with a lookup in flight
    pending_lookups: HashSet<EntityId>,
    reconcile_requested: bool,
    running: bool,

    tx: UnboundedSender<EngineEvent>,
    rx: UnboundedReceiver<EngineEvent>,
    stats: EngineStats,
}

impl<Ctx, Surf, View> FleetEngine<Ctx, Surf, View>
where
    Ctx: FleetViewContext,
    Surf: DisplaySurface,
    View: ViewControls,
{
    pub fn new(
        context: Arc<Ctx>,
        store: Arc<dyn EntityStore>,
        feed: Arc<dyn LocationFeed>,
        view: View,
        config: EngineConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let updater = MarkerTrailUpdater::new(config.marker_style.clone(), config.trail_style.clone());

        Self {
            context,
            store,
            feed,
            surface: None,
            view,
            overlay: TripOverlay::new(config.trip_style.clone()),
            reconciler: TrackedSetReconciler::new(updater.clone()),
            updater,
            config,
            fleet: FleetRegistry::new(),
            desired: DesiredTrackedSet::new(),
            ledger: EntityIndexLedger::new(),
            selection: SelectionState::new(),
            driver_trips: Vec::new(),
            active: Vec::new(),
            pending_lookups: HashSet::new(),
            reconcile_requested: false,
            running: true,
            tx,
            rx,
            stats: EngineStats::default(),
        }
    }

    /// Returns a handle for posting events.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    /// Subscribes to the live feed and, if configured, loads the whole fleet.
    pub fn start(&mut self) {
        let feed = Arc::clone(&self.feed);
        let tx = self.tx.clone();
        self.context.spawn("feed-pump", async move {
            while let Some(message) = feed.recv().await {
                if tx.send(EngineEvent::Location(message)).is_err() {
                    return;
                }
            }
            let _ = tx.send(EngineEvent::FeedClosed);
        });

        if self.config.track_all_on_start {
            let store = Arc::clone(&self.store);
            let tx = self.tx.clone();
            self.context.spawn("fleet-load", async move {
                let result = store.find_all().await;
                let _ = tx.send(EngineEvent::FleetLoaded(result));
            });
        }
        self.spawn_active_query();

        info!(track_all = self.config.track_all_on_start, "Engine started");
    }

    /// Hands the map over to the engine.
    ///
    /// Installs the trip overlay at index 0 and schedules a reconcile so that
    /// everything wanted so far gets drawn. A replacement surface starts
    /// empty, so the ledger is reset and every wanted entity is drawn again.
    pub fn attach_surface(&mut self, mut surface: Surf) -> Result<(), EngineError> {
        if self.overlay.is_installed() {
            info!(entries = self.ledger.len(), "Replacing display surface");
            self.ledger = EntityIndexLedger::new();
            self.pending_lookups.clear();
        }
        self.overlay.install(&mut surface)?;
        self.surface = Some(surface);
        self.reconcile_requested = true;
        info!("Display surface attached");
        Ok(())
    }

    // ========================================================================
    // FRAME LOOP
    // ========================================================================

    /// Runs frames until shutdown.
    pub async fn run(&mut self) {
        while self.next_frame().await {}
        info!(frames = self.stats.frames, "Engine stopped");
    }

    /// Waits for one event, drains the queue, and ends the frame.
    ///
    /// Returns false once the engine has shut down.
    pub async fn next_frame(&mut self) -> bool {
        if !self.running {
            return false;
        }
        match self.rx.recv().await {
            Some(event) => self.handle_event(event),
            None => self.running = false,
        }
        self.drain();
        self.end_frame();
        self.running
    }

    /// Processes whatever is already queued without waiting.
    ///
    /// Returns true if any event was handled.
    pub fn try_frame(&mut self) -> bool {
        let before = self.stats.events;
        self.drain();
        let handled = self.stats.events > before;
        if handled || self.reconcile_requested {
            self.end_frame();
        }
        handled
    }

    /// Runs frames until spawned work stops producing events.
    pub async fn settle(&mut self) {
        let mut idle_rounds = 0;
        while self.running && idle_rounds < SETTLE_IDLE_ROUNDS {
            tokio::task::yield_now().await;
            if self.try_frame() {
                idle_rounds = 0;
            } else {
                idle_rounds += 1;
            }
        }
    }

    /// Closes the frame: runs the reconcile pass if one was requested.
    pub fn end_frame(&mut self) {
        self.stats.frames += 1;
        if self.reconcile_requested {
            self.reconcile_requested = false;
            self.reconcile();
        }
    }

    fn drain(&mut self) {
        while self.running {
            match self.rx.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(_) => break,
            }
        }
    }

    /// Dispatches one event.
    pub fn handle_event(&mut self, event: EngineEvent) {
        self.stats.events += 1;
        match event {
            EngineEvent::Location(message) => self.on_location(message),
            EngineEvent::ToggleTrack(id) => self.on_toggle_track(id),
            EngineEvent::SelectEntity(id) => self.on_select_entity(id),
            EngineEvent::DeselectEntity => self.on_deselect_entity(),
            EngineEvent::SelectTrip(id) => self.on_select_trip(id),
            EngineEvent::SelectDriver(id) => self.on_select_driver(id),
            EngineEvent::DeselectDriver => {
                self.selection.deselect_driver(&mut self.view);
                self.driver_trips.clear();
            }
            EngineEvent::ToggleDriverView => {
                self.selection.toggle_driver_view(&mut self.view);
            }
            EngineEvent::MarkerClicked(index) => self.on_marker_clicked(index),
            EngineEvent::FleetLoaded(result) => self.on_fleet_loaded(result),
            EngineEvent::LookupResolved { id, result, recent } => {
                self.on_lookup_resolved(id, result, recent)
            }
            EngineEvent::TripResolved { id, result } => self.on_trip_resolved(id, result),
            EngineEvent::DriverResolved { id, result } => self.on_driver_resolved(id, result),
            EngineEvent::DriverTripsResolved { id, result } => {
                self.on_driver_trips_resolved(id, result)
            }
            EngineEvent::RefreshActive => self.spawn_active_query(),
            EngineEvent::ActiveLoaded(result) => self.on_active_loaded(result),
            EngineEvent::SaveFailed { id, error } => {
                warn!(entity = %id, error = %error, "Failed to save entity");
                self.stats.collaborator_failures += 1;
            }
            EngineEvent::FeedClosed => info!("Location feed closed"),
            EngineEvent::Shutdown => {
                info!("Shutdown requested");
                self.running = false;
            }
        }
    }

    // ========================================================================
    // LOCATIONS
    // ========================================================================

    fn on_location(&mut self, message: FeedMessage) {
        let id = message.from.clone();
        let report = self.ingest(&id, vec![message.location()]);

        match report.effect {
            IngestEffect::NoEffect => {}
            IngestEffect::EntityNowVisible => self.render_if_wanted(&id),
            IngestEffect::EntityMoved => {
                match report.latest.as_ref().and_then(|point| point.position()) {
                    Some(point) => self.move_entity(&id, point),
                    None => debug!(entity = %id, "Move skipped: latest location has no coordinates"),
                }
            }
        }

        if self.config.persist_locations {
            self.spawn_save(&id);
        }
    }

    fn ingest(&mut self, id: &EntityId, raw: Vec<RawLocation>) -> IngestReport {
        let now = self.context.epoch_millis();
        let report =
            LocationEventProcessor::ingest(&mut self.fleet, &self.desired, &self.ledger, id, raw, now);

        self.stats.defaulted_timestamps += report.defaulted_timestamps as u64;
        if report.malformed > 0 {
            self.stats.malformed_locations += report.malformed as u64;
            self.record_error(EngineError::MalformedLocation {
                entity_id: id.clone(),
                reason: format!("{} record(s) without coordinates", report.malformed),
            });
        }
        report
    }

    fn move_entity(&mut self, id: &EntityId, point: GeoPoint) {
        let Some(surface) = self.surface.as_mut() else {
            self.record_error(EngineError::SurfaceUnavailable);
            return;
        };
        match self.updater.move_to(surface, &self.ledger, id, point) {
            Ok(()) => self.stats.moves += 1,
            Err(e) => self.record_error(e),
        }
    }

    // ========================================================================
    // TRACKED SET
    // ========================================================================

    fn on_toggle_track(&mut self, id: EntityId) {
        let tracked = self.desired.toggle(id.clone());
        if let Some(entity) = self.fleet.get_mut(&id) {
            entity.tracked = tracked;
            self.spawn_save(&id);
        }
        self.reconcile_requested = true;
        info!(entity = %id, tracked, "Toggled tracking");
    }

    fn on_fleet_loaded(&mut self, result: Result<Vec<EntityRecord>, EnvError>) {
        let records = match result {
            Ok(records) => records,
            Err(e) => {
                self.record_error(e.into());
                return;
            }
        };

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let entity = self.fleet.merge_record(record);
            entity.tracked = true;
            ids.push(entity.id.clone());
        }
        for id in &ids {
            self.spawn_save(id);
        }

        info!(entities = ids.len(), "Fleet loaded, tracking all");
        self.desired.replace(ids);
        self.reconcile_requested = true;
    }

    /// One reconcile pass; lookups are spawned for unrendered wanted ids.
    fn reconcile(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            self.record_error(EngineError::SurfaceUnavailable);
            return;
        };

        let pending = &mut self.pending_lookups;
        let mut to_spawn = Vec::new();
        let report = self
            .reconciler
            .reconcile(&self.desired, &mut self.ledger, surface, |id| {
                if pending.insert(id.clone()) {
                    to_spawn.push(id.clone());
                }
            });

        self.stats.reconcile_passes += 1;
        self.stats.removals += report.removed.len() as u64;
        for (_, e) in report.failures {
            self.record_error(e);
        }
        for id in to_spawn {
            self.spawn_lookup(id);
        }
    }

    fn spawn_lookup(&mut self, id: EntityId) {
        let store = Arc::clone(&self.store);
        let feed = Arc::clone(&self.feed);
        let tx = self.tx.clone();
        let count = self.config.last_location_count;
        self.stats.lookups_spawned += 1;

        self.context.spawn("entity-lookup", async move {
            let result = store.find_by_id(&id).await;
            let recent = match &result {
                Ok(Some(_)) if count > 0 => feed.last_messages(&id, count).await,
                _ => Ok(Vec::new()),
            };
            let _ = tx.send(EngineEvent::LookupResolved { id, result, recent });
        });
    }

    fn on_lookup_resolved(
        &mut self,
        id: EntityId,
        result: Result<Option<EntityRecord>, EnvError>,
        recent: Result<Vec<FeedMessage>, EnvError>,
    ) {
        self.pending_lookups.remove(&id);

        let record = match result {
            Ok(Some(record)) => record,
            Ok(None) => return self.record_error(EngineError::LookupMiss(id)),
            Err(e) => return self.record_error(e.into()),
        };

        let wanted = self.desired.contains(&id);
        let entity = self.fleet.merge_record(record);
        let flag_changed = entity.tracked != wanted;
        entity.tracked = wanted;
        if flag_changed {
            self.spawn_save(&id);
        }

        match recent {
            Ok(messages) if !messages.is_empty() => {
                let raw = messages.iter().map(FeedMessage::location).collect();
                let report = self.ingest(&id, raw);
                // Drawn by the live path while the lookup was in flight.
                if report.effect == IngestEffect::EntityMoved {
                    for point in report.positions {
                        self.move_entity(&id, point);
                    }
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => self.record_error(e.into()),
        }

        self.render_if_wanted(&id);
    }

    /// The add path, guarded by the still-wanted / still-absent re-check.
    fn render_if_wanted(&mut self, id: &EntityId) {
        let Some(surface) = self.surface.as_mut() else {
            self.record_error(EngineError::SurfaceUnavailable);
            return;
        };
        let Some(entity) = self.fleet.get(id) else {
            return;
        };

        match self
            .reconciler
            .complete(&self.desired, &mut self.ledger, surface, entity)
        {
            Ok(ResolveOutcome::Rendered(entry)) => {
                self.stats.renders += 1;
                info!(
                    entity = %id,
                    marker_index = entry.marker_index,
                    trail_index = entry.trail_index,
                    "Entity rendered"
                );
            }
            Ok(ResolveOutcome::NoLongerWanted) => {
                self.stats.stale_resolutions += 1;
                debug!(entity = %id, "Dropped resolution: no longer wanted");
            }
            Ok(ResolveOutcome::AlreadyRendered) => {
                self.stats.duplicate_skips += 1;
                debug!(entity = %id, "Dropped resolution: already rendered");
            }
            Ok(ResolveOutcome::NothingToRender) => {
                debug!(entity = %id, "Nothing to render until the first located message");
            }
            Err(e) => self.record_error(e),
        }
    }

    fn spawn_save(&self, id: &EntityId) {
        let Some(entity) = self.fleet.get(id) else {
            return;
        };
        // Entities only seen on the feed have no record to update yet.
        if !entity.stored {
            return;
        }

        let record = entity.to_record();
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        self.context.spawn("entity-save", async move {
            if let Err(error) = store.save(&record).await {
                let _ = tx.send(EngineEvent::SaveFailed {
                    id: record.id,
                    error,
                });
            }
        });
    }

    // ========================================================================
    // SELECTION & TRIPS
    // ========================================================================

    fn on_select_entity(&mut self, id: EntityId) {
        let latest = self
            .fleet
            .get(&id)
            .and_then(|entity| entity.history.latest_position());
        info!(entity = %id, "Entity selected");
        self.selection
            .select_entity(id, latest, &mut self.view, self.config.zoom_level);
        self.clear_overlay();
    }

    fn on_deselect_entity(&mut self) {
        if let Some(id) = self.selection.deselect_entity(&mut self.view) {
            debug!(entity = %id, "Entity deselected");
        }
        self.clear_overlay();
    }

    fn on_marker_clicked(&mut self, index: usize) {
        let owner = self
            .surface
            .as_ref()
            .and_then(|surface| surface.get(index))
            .and_then(MapObject::as_marker)
            .map(|marker| marker.owner.clone());

        match owner {
            Some(id) => self.on_select_entity(id),
            None => debug!(index, "Click on non-marker object ignored"),
        }
    }

    fn on_select_trip(&mut self, id: TripId) {
        self.selection.request_trip(id.clone());

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        self.context.spawn("trip-fetch", async move {
            let result = store.find_trip(&id).await;
            let _ = tx.send(EngineEvent::TripResolved { id, result });
        });
    }

    fn on_trip_resolved(&mut self, id: TripId, result: Result<Option<TripRecord>, EnvError>) {
        if !self.selection.is_current_trip(&id) {
            self.stats.stale_trips += 1;
            debug!(trip = %id, "Dropped superseded trip");
            return;
        }

        let trip = match result {
            Ok(Some(trip)) => trip,
            Ok(None) => {
                info!(trip = %id, "Trip not found");
                return;
            }
            Err(e) => return self.record_error(e.into()),
        };

        let Some(surface) = self.surface.as_mut() else {
            self.record_error(EngineError::SurfaceUnavailable);
            return;
        };
        if let Err(e) = self.overlay.set_path(surface, trip.events.clone()) {
            return self.record_error(e);
        }
        TripOverlay::center_on_first(&mut self.view, &trip.events, self.config.zoom_level);
        info!(trip = %id, points = trip.events.len(), "Trip shown");
    }

    fn clear_overlay(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Err(e) = self.overlay.clear(surface) {
            self.record_error(e);
        }
    }

    fn on_select_driver(&mut self, id: DriverId) {
        self.selection.select_driver(id.clone(), &mut self.view);
        self.driver_trips.clear();

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let driver = id.clone();
        self.context.spawn("driver-fetch", async move {
            let result = store.find_driver(&driver).await;
            let _ = tx.send(EngineEvent::DriverResolved { id: driver, result });
        });

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        self.context.spawn("driver-trips", async move {
            let result = store.trips_for_driver(&id).await;
            let _ = tx.send(EngineEvent::DriverTripsResolved { id, result });
        });
    }

    fn on_driver_trips_resolved(&mut self, id: DriverId, result: Result<Vec<TripRecord>, EnvError>) {
        if !self.selection.is_selected_driver(&id) {
            debug!(driver = %id, "Dropped trips for deselected driver");
            return;
        }
        match result {
            Ok(mut trips) => {
                trips.sort_by(|a, b| a.id.cmp(&b.id));
                debug!(driver = %id, trips = trips.len(), "Driver trips loaded");
                self.driver_trips = trips;
            }
            Err(e) => self.record_error(e.into()),
        }
    }

    fn spawn_active_query(&self) {
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        self.context.spawn("active-query", async move {
            let result = store.find_where(&|record: &EntityRecord| record.active).await;
            let _ = tx.send(EngineEvent::ActiveLoaded(result));
        });
    }

    fn on_active_loaded(&mut self, result: Result<Vec<EntityRecord>, EnvError>) {
        match result {
            Ok(mut records) => {
                records.sort_by(|a, b| a.id.cmp(&b.id));
                self.active = records;
            }
            Err(e) => self.record_error(e.into()),
        }
    }

    fn on_driver_resolved(&mut self, id: DriverId, result: Result<Option<DriverRecord>, EnvError>) {
        if !self.selection.is_selected_driver(&id) {
            debug!(driver = %id, "Dropped resolution for deselected driver");
            return;
        }

        let driver = match result {
            Ok(Some(driver)) => driver,
            Ok(None) => {
                info!(driver = %id, "Driver not found");
                return;
            }
            Err(e) => return self.record_error(e.into()),
        };

        let latest = driver
            .vehicle
            .as_ref()
            .and_then(|vehicle| self.fleet.get(vehicle))
            .and_then(|entity| entity.history.latest_position());
        if let Some(point) = latest {
            self.view.center_view(point, self.config.zoom_level);
        }
    }

    // ========================================================================
    // ERRORS
    // ========================================================================

    fn record_error(&mut self, e: EngineError) {
        match &e {
            EngineError::SurfaceUnavailable => {
                self.stats.surface_unavailable += 1;
                info!("Skipped render: display surface not attached");
            }
            EngineError::LookupMiss(id) => {
                self.stats.lookup_misses += 1;
                info!(entity = %id, "Entity lookup found nothing");
            }
            EngineError::DuplicateEntry(id) => {
                self.stats.duplicate_skips += 1;
                debug!(entity = %id, "Entity already rendered");
            }
            EngineError::NothingToRender(id) => {
                debug!(entity = %id, "Nothing to render");
            }
            EngineError::MalformedLocation { entity_id, reason } => {
                warn!(entity = %entity_id, reason = %reason, "Malformed location stored");
            }
            EngineError::Env(inner) => {
                self.stats.collaborator_failures += 1;
                warn!(error = %inner, "Collaborator call failed");
            }
            EngineError::SurfaceMismatch { .. } | EngineError::Ledger(_) => {
                self.stats.invariant_violations += 1;
                error!(error = %e, "Ledger and surface disagree");
            }
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Ids with a marker/trail pair on the surface.
    pub fn rendered_ids(&self) -> HashSet<EntityId> {
        self.ledger.entity_ids()
    }

    /// Ids the user wants on the map.
    pub fn desired_ids(&self) -> HashSet<EntityId> {
        self.desired.to_set()
    }

    pub fn history(&self, id: &EntityId) -> Option<&LocationHistory> {
        self.fleet.get(id).map(|entity| &entity.history)
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// True once any entity is known.
    pub fn fleet_connected(&self) -> bool {
        !self.fleet.is_empty()
    }

    /// Active entities as of the last store query, ordered by id.
    pub fn active_entities(&self) -> &[EntityRecord] {
        &self.active
    }

    /// Trips driven by the selected driver; empty until they resolve.
    pub fn selected_driver_trips(&self) -> &[TripRecord] {
        &self.driver_trips
    }

    pub fn fleet(&self) -> &FleetRegistry {
        &self.fleet
    }

    pub fn ledger(&self) -> &EntityIndexLedger {
        &self.ledger
    }

    pub fn surface(&self) -> Option<&Surf> {
        self.surface.as_ref()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn pending_lookups(&self) -> usize {
        self.pending_lookups.len()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
