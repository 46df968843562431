//! In-memory table of active rallies and per-player counters.
//!
//! The store is an ordinary value owned by whoever drives the scan loop.
//! Each monitored device gets its own store.

use chrono::{DateTime, Local};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::record::{Field, IdentityKey, NormalizedRecord, RallyStatus, TrackedRally};

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No rally existed under the key; one was created
    Created,
    /// Existing rally whose status changed
    StatusChanged { previous: RallyStatus },
    /// Existing rally reread without a status change
    Refreshed,
}

/// Result of `RallyStore::upsert`.
#[derive(Debug, Clone)]
pub struct Upsert {
    pub rally: TrackedRally,
    pub outcome: UpsertOutcome,
}

impl Upsert {
    pub fn was_new(&self) -> bool {
        self.outcome == UpsertOutcome::Created
    }
}

#[derive(Debug, Default)]
pub struct RallyStore {
    rallies: BTreeMap<IdentityKey, TrackedRally>,
    player_counts: HashMap<String, u32>,
}

impl RallyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&TrackedRally> {
        self.rallies.get(key)
    }

    /// Returns the most recently seen rally occupying `slot`, if any.
    pub fn find_by_slot(&self, slot: usize) -> Option<&TrackedRally> {
        self.rallies
            .values()
            .filter(|rally| rally.key.slot() == slot)
            .max_by_key(|rally| rally.last_seen_at)
    }

    /// Creates or updates the rally stored under `key`.
    ///
    /// Unknown fields in `record` never overwrite known values, so a
    /// partial misread only refreshes `last_seen_at`.
    pub fn upsert(
        &mut self,
        key: &IdentityKey,
        record: &NormalizedRecord,
        now: DateTime<Local>,
    ) -> Upsert {
        if let Some(rally) = self.rallies.get_mut(key) {
            let previous = rally.status;
            let mut outcome = UpsertOutcome::Refreshed;

            if record.status.is_known() && record.status != previous {
                rally.status = record.status;
                rally.last_status_change_at = now;
                outcome = UpsertOutcome::StatusChanged { previous };
            }
            if record.target.is_known() {
                rally.target = record.target.clone();
            }
            rally.last_seen_at = now;

            return Upsert {
                rally: rally.clone(),
                outcome,
            };
        }

        let rally = TrackedRally {
            key: key.clone(),
            player: record.player.clone(),
            target: record.target.clone(),
            status: record.status,
            slot_index: record.slot_index,
            first_seen_at: now,
            last_seen_at: now,
            last_status_change_at: now,
        };
        self.count_initiation(&rally.player);
        self.rallies.insert(key.clone(), rally.clone());

        Upsert {
            rally,
            outcome: UpsertOutcome::Created,
        }
    }

    /// Moves a rally tracked without a player name to its player key.
    ///
    /// The rally keeps its timestamps. The player's counter is incremented
    /// here because the creation was never attributed to anyone. Returns
    /// false if nothing is stored under `from` or `to` is already taken.
    pub fn promote(&mut self, from: &IdentityKey, to: IdentityKey, player: &str) -> bool {
        if self.rallies.contains_key(&to) {
            return false;
        }
        let Some(mut rally) = self.rallies.remove(from) else {
            return false;
        };

        rally.key = to.clone();
        rally.player = Field::Known(player.to_string());
        self.count_initiation(&rally.player);
        self.rallies.insert(to, rally);
        true
    }

    /// Removes and returns every rally whose key was not observed.
    pub fn sweep(&mut self, observed: &HashSet<IdentityKey>) -> Vec<TrackedRally> {
        let missing: Vec<IdentityKey> = self
            .rallies
            .keys()
            .filter(|key| !observed.contains(*key))
            .cloned()
            .collect();

        missing
            .iter()
            .filter_map(|key| self.rallies.remove(key))
            .collect()
    }

    fn count_initiation(&mut self, player: &Field) {
        if let Some(name) = player.as_known() {
            *self.player_counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    pub fn count_for(&self, player: &str) -> u32 {
        self.player_counts.get(player).copied().unwrap_or(0)
    }

    pub fn player_counts(&self) -> &HashMap<String, u32> {
        &self.player_counts
    }

    /// Player counts sorted by count (descending), then name.
    pub fn ranked_counts(&self) -> Vec<(&str, u32)> {
        let mut ranked: Vec<(&str, u32)> = self
            .player_counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Active rallies ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedRally> {
        self.rallies.values()
    }

    pub fn len(&self) -> usize {
        self.rallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rallies.is_empty()
    }
}
