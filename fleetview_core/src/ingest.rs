//! Location ingestion.
//!
//! Normalizes raw records, appends them to the entity's history and states
//! explicitly what the caller must do next. The decision depends only on the
//! engine's own state (ledger + desired set), never on flags carried by the
//! incoming records:
//!
//! ```text
//!   not desired, not rendered  ──► NoEffect
//!   desired,     not rendered  ──► EntityNowVisible  (add path)
//!   rendered                   ──► EntityMoved       (move path)
//! ```

use crate::fleet::FleetRegistry;
use crate::ledger::EntityIndexLedger;
use crate::reconciler::DesiredTrackedSet;
use fleetview_env::{EntityId, GeoPoint, LocationPoint, RawLocation};
use tracing::debug;

/// What the caller should do after an ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEffect {
    /// Entity is not tracked; history updated, nothing to draw
    NoEffect,
    /// Entity is wanted but not on the surface yet; run the add path
    EntityNowVisible,
    /// Entity is on the surface; run the move path
    EntityMoved,
}

/// Outcome of one ingest call.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub effect: IngestEffect,
    /// Records appended to the history
    pub appended: usize,
    /// Records that arrived without a timestamp
    pub defaulted_timestamps: usize,
    /// Records lacking a coordinate (stored, but not drawable)
    pub malformed: usize,
    /// The last record appended, if any
    pub latest: Option<LocationPoint>,
    /// Drawable positions among the appended records, oldest first
    pub positions: Vec<GeoPoint>,
}

/// Stateless ingestion logic over the engine's state objects.
pub struct LocationEventProcessor;

impl LocationEventProcessor {
    /// Appends `raw` (in order) to the entity's history and decides the effect.
    ///
    /// Unknown entities are registered as untracked. `now_millis` stamps every
    /// record that arrived without a timestamp.
    pub fn ingest(
        fleet: &mut FleetRegistry,
        desired: &DesiredTrackedSet,
        ledger: &EntityIndexLedger,
        entity_id: &EntityId,
        raw: Vec<RawLocation>,
        now_millis: i64,
    ) -> IngestReport {
        let entity = fleet.get_or_observe(entity_id);

        let mut report = IngestReport {
            effect: IngestEffect::NoEffect,
            appended: 0,
            defaulted_timestamps: 0,
            malformed: 0,
            latest: None,
            positions: Vec::new(),
        };

        for record in raw {
            if record.timestamp.is_none() {
                report.defaulted_timestamps += 1;
            }
            let point = record.normalize(now_millis);
            match point.position() {
                Some(position) => report.positions.push(position),
                None => report.malformed += 1,
            }
            entity.history.push(point.clone());
            report.latest = Some(point);
            report.appended += 1;
        }

        report.effect = Self::decide(desired, ledger, entity_id);
        debug!(
            entity = %entity_id,
            appended = report.appended,
            effect = ?report.effect,
            "Ingested locations"
        );
        report
    }

    /// The add/move/nothing decision, from ledger and desired-set membership.
    pub fn decide(
        desired: &DesiredTrackedSet,
        ledger: &EntityIndexLedger,
        entity_id: &EntityId,
    ) -> IngestEffect {
        if ledger.contains(entity_id) {
            IngestEffect::EntityMoved
        } else if desired.contains(entity_id) {
            IngestEffect::EntityNowVisible
        } else {
            IngestEffect::NoEffect
        }
    }
}
