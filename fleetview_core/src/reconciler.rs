//! Tracked-set reconciliation.
//!
//! Aligns {rendered entities} with {desired entities} in two steps:
//!
//! 1. **Removals** (synchronous): every ledger entry that is no longer
//!    desired is lifted off the surface and the ledger is renumbered.
//! 2. **Additions** (asynchronous): every desired id without a ledger entry is
//!    handed to a lookup callback. When the lookup resolves, [`complete`]
//!    renders the entity only if it is *still* desired and *still* absent.
//!
//! Step 2's re-check is the only protection against lookups racing with
//! toggles; there is no cancellation and no locking.
//!
//! [`complete`]: TrackedSetReconciler::complete

use crate::error::EngineError;
use crate::fleet::TrackedEntity;
use crate::ledger::{EntityIndexLedger, LedgerEntry};
use crate::updater::MarkerTrailUpdater;
use fleetview_env::{DisplaySurface, EntityId};
use std::collections::HashSet;
use tracing::{debug, error};

/// The set of entity ids the user wants on the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredTrackedSet {
    ids: HashSet<EntityId>,
}

impl DesiredTrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the id was newly added.
    pub fn insert(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    /// Returns true if the id was present.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        self.ids.remove(id)
    }

    /// Flips membership and returns the new state.
    pub fn toggle(&mut self, id: EntityId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Replaces the whole set.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.ids = ids.into_iter().collect();
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_set(&self) -> HashSet<EntityId> {
        self.ids.clone()
    }
}

/// Summary of one reconcile pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Entities taken off the surface
    pub removed: Vec<EntityId>,
    /// Entities handed to the lookup callback
    pub requested: Vec<EntityId>,
    /// Removals that failed (the entity stays in the ledger)
    pub failures: Vec<(EntityId, EngineError)>,
}

/// What happened when a lookup resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// Entity drawn; here is its ledger entry
    Rendered(LedgerEntry),
    /// Toggled off while the lookup was in flight; dropped
    NoLongerWanted,
    /// Another path rendered it first; dropped
    AlreadyRendered,
    /// Entity has no drawable point yet; it will appear on its first location
    NothingToRender,
}

/// Drives ledger and surface toward the desired set.
#[derive(Debug, Clone)]
pub struct TrackedSetReconciler {
    updater: MarkerTrailUpdater,
}

impl TrackedSetReconciler {
    pub fn new(updater: MarkerTrailUpdater) -> Self {
        Self { updater }
    }

    /// Runs one reconcile pass.
    ///
    /// `lookup` is called once per desired-but-unrendered id and must arrange
    /// for [`complete`](Self::complete) to be called when the entity resolves.
    pub fn reconcile<S, F>(
        &self,
        desired: &DesiredTrackedSet,
        ledger: &mut EntityIndexLedger,
        surface: &mut S,
        mut lookup: F,
    ) -> ReconcileReport
    where
        S: DisplaySurface + ?Sized,
        F: FnMut(&EntityId),
    {
        let mut report = ReconcileReport::default();

        let mut stale: Vec<EntityId> = ledger
            .entries()
            .filter(|entry| !desired.contains(&entry.entity_id))
            .map(|entry| entry.entity_id.clone())
            .collect();
        stale.sort();

        for id in stale {
            match self.updater.remove(surface, ledger, &id) {
                Ok(_) => report.removed.push(id),
                Err(e) => {
                    error!(entity = %id, error = %e, "Failed to remove entity from surface");
                    report.failures.push((id, e));
                }
            }
        }

        let mut missing: Vec<EntityId> = desired
            .iter()
            .filter(|id| !ledger.contains(id))
            .cloned()
            .collect();
        missing.sort();

        for id in missing {
            lookup(&id);
            report.requested.push(id);
        }

        debug!(
            removed = report.removed.len(),
            requested = report.requested.len(),
            "Reconcile pass"
        );
        report
    }

    /// Finishes an asynchronous lookup for `entity`.
    pub fn complete<S: DisplaySurface + ?Sized>(
        &self,
        desired: &DesiredTrackedSet,
        ledger: &mut EntityIndexLedger,
        surface: &mut S,
        entity: &TrackedEntity,
    ) -> Result<ResolveOutcome, EngineError> {
        if !desired.contains(&entity.id) {
            return Ok(ResolveOutcome::NoLongerWanted);
        }
        if ledger.contains(&entity.id) {
            return Ok(ResolveOutcome::AlreadyRendered);
        }

        match self.updater.add(surface, ledger, entity) {
            Ok(entry) => Ok(ResolveOutcome::Rendered(entry)),
            Err(EngineError::NothingToRender(_)) => Ok(ResolveOutcome::NothingToRender),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_env::{MarkerStyle, PathStyle, RawLocation, VecSurface};

    fn reconciler() -> TrackedSetReconciler {
        TrackedSetReconciler::new(MarkerTrailUpdater::new(
            MarkerStyle::default(),
            PathStyle::new("#4caf50", 5),
        ))
    }

    fn id(s: &str) -> EntityId {
        EntityId::from(s)
    }

    fn located(name: &str) -> TrackedEntity {
        let mut e = TrackedEntity::observed(id(name));
        e.history.push(RawLocation::new(1.0, 2.0, 0.0, 0.0).normalize(0));
        e
    }

    #[test]
    fn test_toggle() {
        let mut desired = DesiredTrackedSet::new();
        assert!(desired.toggle(id("a")));
        assert!(desired.contains(&id("a")));
        assert!(!desired.toggle(id("a")));
        assert!(desired.is_empty());
    }

    #[test]
    fn test_reconcile_requests_missing() {
        let mut desired = DesiredTrackedSet::new();
        desired.insert(id("b"));
        desired.insert(id("a"));
        let mut ledger = EntityIndexLedger::new();
        let mut surface = VecSurface::new();

        let mut asked = Vec::new();
        let report = reconciler().reconcile(&desired, &mut ledger, &mut surface, |id| {
            asked.push(id.clone())
        });

        assert_eq!(asked, vec![id("a"), id("b")]);
        assert_eq!(report.requested.len(), 2);
        assert!(surface.is_empty());
    }

    #[test]
    fn test_reconcile_removes_undesired() {
        let rec = reconciler();
        let mut desired = DesiredTrackedSet::new();
        desired.insert(id("X"));
        desired.insert(id("Y"));
        let mut ledger = EntityIndexLedger::new();
        let mut surface = VecSurface::new();
        rec.complete(&desired, &mut ledger, &mut surface, &located("X")).unwrap();
        rec.complete(&desired, &mut ledger, &mut surface, &located("Y")).unwrap();

        desired.remove(&id("X"));
        let report = rec.reconcile(&desired, &mut ledger, &mut surface, |_| {
            panic!("nothing should be looked up")
        });

        assert_eq!(report.removed, vec![id("X")]);
        assert_eq!(surface.len(), 2);
        let y = ledger.lookup(&id("Y")).unwrap();
        assert_eq!((y.marker_index, y.trail_index), (0, 1));
    }

    #[test]
    fn test_complete_after_toggle_off_leaves_no_orphan() {
        let rec = reconciler();
        let mut desired = DesiredTrackedSet::new();
        desired.insert(id("Z"));
        let mut ledger = EntityIndexLedger::new();
        let mut surface = VecSurface::new();

        let mut pending = Vec::new();
        rec.reconcile(&desired, &mut ledger, &mut surface, |id| pending.push(id.clone()));
        desired.remove(&id("Z"));

        let outcome = rec
            .complete(&desired, &mut ledger, &mut surface, &located("Z"))
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::NoLongerWanted);
        assert!(ledger.is_empty());
        assert_eq!(surface.count_owned_by(&id("Z")), 0);
    }

    #[test]
    fn test_double_completion_renders_once() {
        let rec = reconciler();
        let mut desired = DesiredTrackedSet::new();
        desired.insert(id("Z"));
        let mut ledger = EntityIndexLedger::new();
        let mut surface = VecSurface::new();

        let first = rec.complete(&desired, &mut ledger, &mut surface, &located("Z")).unwrap();
        let second = rec.complete(&desired, &mut ledger, &mut surface, &located("Z")).unwrap();

        assert!(matches!(first, ResolveOutcome::Rendered(_)));
        assert_eq!(second, ResolveOutcome::AlreadyRendered);
        assert_eq!(surface.len(), 2);
    }

    #[test]
    fn test_complete_without_locations() {
        let rec = reconciler();
        let mut desired = DesiredTrackedSet::new();
        desired.insert(id("Z"));
        let mut ledger = EntityIndexLedger::new();
        let mut surface = VecSurface::new();

        let outcome = rec
            .complete(
                &desired,
                &mut ledger,
                &mut surface,
                &TrackedEntity::observed(id("Z")),
            )
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::NothingToRender);
        assert!(surface.is_empty());
    }
}
