//! The entity index ledger.
//!
//! The display surface has no notion of "the object for entity X", only
//! positions that shift on every insert/remove. The ledger is the single
//! source of truth for which entities are rendered and where their marker
//! and trail currently sit.
//!
//! # Renumbering
//!
//! ```text
//! surface:  [0: overlay] [1: pin X] [2: trail X] [3: pin Y] [4: trail Y]
//! ledger:   X -> (1, 2)   Y -> (3, 4)
//!
//! remove X (trail at 2, then pin at 1), remove_and_renumber(X)
//!
//! surface:  [0: overlay] [1: pin Y] [2: trail Y]
//! ledger:   Y -> (1, 2)
//! ```
//!
//! Every index above a removed slot moves down by one per removed slot below
//! it. Forgetting this silently redirects later updates to the wrong objects.

use fleetview_env::EntityId;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Where one rendered entity lives on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub entity_id: EntityId,
    pub marker_index: usize,
    pub trail_index: usize,
}

/// A broken ledger invariant, as reported by [`EntityIndexLedger::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerViolation {
    /// An index points past the end of the surface
    OutOfRange { entity_id: EntityId, index: usize, len: usize },
    /// Two entries claim the same index
    SharedIndex { index: usize },
    /// The trail does not sit directly after the marker
    NotAdjacent { entity_id: EntityId },
}

/// Maps entity ids to the surface indices of their marker and trail.
#[derive(Debug, Default, Clone)]
pub struct EntityIndexLedger {
    entries: HashMap<EntityId, LedgerEntry>,
}

impl EntityIndexLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `id`, if rendered.
    pub fn lookup(&self, id: &EntityId) -> Option<&LedgerEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    /// Records a newly rendered entity.
    ///
    /// Fails with `DuplicateEntry` (leaving the existing entry untouched) if the
    /// entity is already present.
    pub fn insert(
        &mut self,
        id: EntityId,
        marker_index: usize,
        trail_index: usize,
    ) -> Result<(), LedgerError> {
        if self.entries.contains_key(&id) {
            return Err(LedgerError::DuplicateEntry(id));
        }

        self.entries.insert(
            id.clone(),
            LedgerEntry {
                entity_id: id,
                marker_index,
                trail_index,
            },
        );
        Ok(())
    }

    /// Removes the entry for `id` and shifts every other entry down past the
    /// two freed slots.
    ///
    /// Call this only after both objects have been removed from the surface.
    pub fn remove_and_renumber(&mut self, id: &EntityId) -> Result<LedgerEntry, LedgerError> {
        let removed = self
            .entries
            .remove(id)
            .ok_or_else(|| LedgerError::UnknownEntry(id.clone()))?;

        let freed = [removed.marker_index, removed.trail_index];
        let shift = |index: usize| index - freed.iter().filter(|&&f| f < index).count();

        for entry in self.entries.values_mut() {
            entry.marker_index = shift(entry.marker_index);
            entry.trail_index = shift(entry.trail_index);
        }

        Ok(removed)
    }

    /// All entries (iteration order undefined).
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Ids of every rendered entity.
    pub fn entity_ids(&self) -> HashSet<EntityId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks every invariant against a surface of `surface_len` objects.
    pub fn validate(&self, surface_len: usize) -> Vec<LedgerViolation> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for entry in self.entries.values() {
            if entry.trail_index != entry.marker_index + 1 {
                violations.push(LedgerViolation::NotAdjacent {
                    entity_id: entry.entity_id.clone(),
                });
            }

            for index in [entry.marker_index, entry.trail_index] {
                if index >= surface_len {
                    violations.push(LedgerViolation::OutOfRange {
                        entity_id: entry.entity_id.clone(),
                        index,
                        len: surface_len,
                    });
                }
                if !seen.insert(index) {
                    violations.push(LedgerViolation::SharedIndex { index });
                }
            }
        }

        violations
    }
}

/// Errors raised by ledger bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Entity already rendered: {0}")]
    DuplicateEntry(EntityId),

    #[error("Entity not in ledger: {0}")]
    UnknownEntry(EntityId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> EntityId {
        EntityId::from(s)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut ledger = EntityIndexLedger::new();
        ledger.insert(id("X"), 0, 1).unwrap();

        let entry = ledger.lookup(&id("X")).unwrap();
        assert_eq!((entry.marker_index, entry.trail_index), (0, 1));
        assert!(ledger.lookup(&id("Y")).is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut ledger = EntityIndexLedger::new();
        ledger.insert(id("X"), 0, 1).unwrap();

        let err = ledger.insert(id("X"), 4, 5).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateEntry(id("X")));

        // Original entry untouched
        assert_eq!(ledger.lookup(&id("X")).unwrap().marker_index, 0);
    }

    #[test]
    fn test_remove_first_renumbers_later() {
        let mut ledger = EntityIndexLedger::new();
        ledger.insert(id("X"), 0, 1).unwrap();
        ledger.insert(id("Y"), 2, 3).unwrap();

        ledger.remove_and_renumber(&id("X")).unwrap();

        let y = ledger.lookup(&id("Y")).unwrap();
        assert_eq!((y.marker_index, y.trail_index), (0, 1));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_remove_last_leaves_earlier_alone() {
        let mut ledger = EntityIndexLedger::new();
        ledger.insert(id("X"), 1, 2).unwrap();
        ledger.insert(id("Y"), 3, 4).unwrap();
        ledger.insert(id("Z"), 5, 6).unwrap();

        ledger.remove_and_renumber(&id("Y")).unwrap();

        assert_eq!(ledger.lookup(&id("X")).unwrap().marker_index, 1);
        assert_eq!(ledger.lookup(&id("Z")).unwrap().marker_index, 3);
        assert_eq!(ledger.lookup(&id("Z")).unwrap().trail_index, 4);
    }

    #[test]
    fn test_remove_unknown() {
        let mut ledger = EntityIndexLedger::new();
        assert_eq!(
            ledger.remove_and_renumber(&id("nope")),
            Err(LedgerError::UnknownEntry(id("nope")))
        );
    }

    #[test]
    fn test_validate_flags_out_of_range_and_sharing() {
        let mut ledger = EntityIndexLedger::new();
        ledger.insert(id("X"), 1, 2).unwrap();
        ledger.insert(id("Y"), 2, 3).unwrap();

        let violations = ledger.validate(3);
        assert!(violations.contains(&LedgerViolation::SharedIndex { index: 2 }));
        assert!(violations.contains(&LedgerViolation::OutOfRange {
            entity_id: id("Y"),
            index: 3,
            len: 3,
        }));
    }

    #[test]
    fn test_validate_clean_ledger() {
        let mut ledger = EntityIndexLedger::new();
        ledger.insert(id("X"), 1, 2).unwrap();
        ledger.insert(id("Y"), 3, 4).unwrap();

        assert!(ledger.validate(5).is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..12).prop_map(Op::Add),
            (0u8..12).prop_map(Op::Remove),
        ]
    }

    proptest! {
        /// After every remove, each surviving entry equals its previous indices
        /// minus two per removed entry that sat below it, and still points at
        /// its own objects in a model surface.
        #[test]
        fn prop_renumbering_matches_model_surface(ops in prop::collection::vec(op(), 1..60)) {
            let mut ledger = EntityIndexLedger::new();
            // Index 0 is the reserved overlay slot.
            let mut surface: Vec<Option<(EntityId, bool)>> = vec![None];

            for op in ops {
                match op {
                    Op::Add(n) => {
                        let eid = EntityId::new(format!("e{}", n));
                        if ledger.contains(&eid) {
                            continue;
                        }
                        let marker = surface.len();
                        surface.push(Some((eid.clone(), true)));
                        surface.push(Some((eid.clone(), false)));
                        ledger.insert(eid, marker, marker + 1).unwrap();
                    }
                    Op::Remove(n) => {
                        let eid = EntityId::new(format!("e{}", n));
                        let Some(entry) = ledger.lookup(&eid).cloned() else {
                            continue;
                        };
                        let before: HashMap<EntityId, usize> = ledger
                            .entries()
                            .map(|e| (e.entity_id.clone(), e.marker_index))
                            .collect();

                        surface.remove(entry.trail_index);
                        surface.remove(entry.marker_index);
                        ledger.remove_and_renumber(&eid).unwrap();

                        for e in ledger.entries() {
                            let old = before[&e.entity_id];
                            let expected = if old > entry.marker_index { old - 2 } else { old };
                            prop_assert_eq!(e.marker_index, expected);
                        }
                    }
                }

                prop_assert!(ledger.validate(surface.len()).is_empty());
                for e in ledger.entries() {
                    prop_assert_eq!(
                        surface[e.marker_index].clone(),
                        Some((e.entity_id.clone(), true))
                    );
                    prop_assert_eq!(
                        surface[e.trail_index].clone(),
                        Some((e.entity_id.clone(), false))
                    );
                }
            }
        }
    }
}
