//! One scan cycle: collect, reconcile, sweep, report.
//!
//! The tracker itself is stateless apart from its status vocabulary. All
//! rally state lives in the `RallyStore` passed in by the caller.

use chrono::{DateTime, Local};
use log::debug;
use std::collections::HashSet;
use std::fmt;

use super::identity::resolve;
use super::normalize::{normalize, StatusVocabulary};
use super::record::{Field, IdentityKey, RallyEvent, RawSlotRecord};
use super::store::{RallyStore, UpsertOutcome};

/// Phases of a scan cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Collect,
    Reconcile,
    Sweep,
    Report,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePhase::Collect => write!(f, "Collect"),
            CyclePhase::Reconcile => write!(f, "Reconcile"),
            CyclePhase::Sweep => write!(f, "Sweep"),
            CyclePhase::Report => write!(f, "Report"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RallyTracker {
    vocabulary: StatusVocabulary,
}

impl RallyTracker {
    pub fn new(vocabulary: StatusVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Runs one scan cycle over `batch` and returns the resulting events.
    ///
    /// Events are ordered: all completions, then new rallies, then status
    /// changes. Slots that were not extracted or were rejected as empty
    /// simply contribute nothing.
    pub fn run_cycle(
        &self,
        store: &mut RallyStore,
        batch: Vec<RawSlotRecord>,
        now: DateTime<Local>,
    ) -> Vec<RallyEvent> {
        debug!("{}: {} slot record(s)", CyclePhase::Collect, batch.len());

        let mut observed: HashSet<IdentityKey> = HashSet::new();
        let mut created = Vec::new();
        let mut changed = Vec::new();

        for raw in &batch {
            let Some(record) = normalize(raw, &self.vocabulary) else {
                debug!(
                    "{}: slot {} rejected as empty",
                    CyclePhase::Reconcile,
                    raw.slot_index + 1
                );
                continue;
            };

            let resolution = resolve(&record, store);
            let mut promoted = false;
            if let (Some(from), Field::Known(player)) = (&resolution.promote_from, &record.player) {
                promoted = store.promote(from, resolution.key.clone(), player);
                if promoted {
                    debug!(
                        "{}: {} identified as {}",
                        CyclePhase::Reconcile,
                        from,
                        resolution.key
                    );
                }
            }

            let upsert = store.upsert(&resolution.key, &record, now);
            observed.insert(resolution.key);

            // A promoted rally is announced once more under its player, with
            // its current status and original first_seen_at.
            if promoted {
                created.push(RallyEvent::New(upsert.rally));
                continue;
            }

            match upsert.outcome {
                UpsertOutcome::Created => created.push(RallyEvent::New(upsert.rally)),
                UpsertOutcome::StatusChanged { previous } => {
                    changed.push(RallyEvent::StatusChanged {
                        rally: upsert.rally,
                        previous,
                    })
                }
                UpsertOutcome::Refreshed => {}
            }
        }

        let completed: Vec<RallyEvent> = store
            .sweep(&observed)
            .into_iter()
            .map(RallyEvent::Completed)
            .collect();
        debug!("{}: {} rally(ies) completed", CyclePhase::Sweep, completed.len());

        let mut events = completed;
        events.extend(created);
        events.extend(changed);

        debug!(
            "{}: {} event(s), {} active",
            CyclePhase::Report,
            events.len(),
            store.len()
        );
        events
    }
}
