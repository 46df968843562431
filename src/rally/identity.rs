//! Maps a normalized record onto the identity of the rally it describes.
//!
//! A rally stays in the same slot until it completes, so slot position is
//! the anchor. The player name refines it when it was read. A read with no
//! player name never starts a new rally in a slot that already has one.

use super::record::{Field, IdentityKey, NormalizedRecord};
use super::store::RallyStore;

/// Outcome of identity resolution for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Key the record should be applied under
    pub key: IdentityKey,
    /// Nameless rally in the same slot that should be re-keyed to `key` first
    pub promote_from: Option<IdentityKey>,
}

impl Resolution {
    fn direct(key: IdentityKey) -> Self {
        Self {
            key,
            promote_from: None,
        }
    }
}

/// Resolves the identity key for `record` against the current store.
///
/// - Known player: `(slot, player)`. A different known player in the same
///   slot therefore gets a different key, and the old rally is swept at
///   the end of the cycle.
/// - Known player and the slot holds a rally whose player was never read:
///   that rally is promoted instead of being completed and recreated.
/// - Unknown player: whatever rally currently occupies the slot, or a
///   nameless slot key if the slot is empty.
pub fn resolve(record: &NormalizedRecord, store: &RallyStore) -> Resolution {
    let slot = record.slot_index;

    match &record.player {
        Field::Known(player) => {
            let key = IdentityKey::Player {
                slot,
                player: player.clone(),
            };
            let nameless = IdentityKey::Slot(slot);

            if store.get(&key).is_none() && store.get(&nameless).is_some() {
                Resolution {
                    key,
                    promote_from: Some(nameless),
                }
            } else {
                Resolution::direct(key)
            }
        }
        Field::Unknown => match store.find_by_slot(slot) {
            Some(existing) => Resolution::direct(existing.key.clone()),
            None => Resolution::direct(IdentityKey::Slot(slot)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rally::record::RallyStatus;
    use chrono::Local;

    fn record(slot: usize, player: Option<&str>) -> NormalizedRecord {
        NormalizedRecord {
            slot_index: slot,
            player: match player {
                Some(p) => Field::Known(p.to_string()),
                None => Field::Unknown,
            },
            target: Field::Known("Lvl 3 Barbarian Fort".to_string()),
            status: RallyStatus::Preparing,
        }
    }

    fn key(slot: usize, player: &str) -> IdentityKey {
        IdentityKey::Player {
            slot,
            player: player.to_string(),
        }
    }

    #[test]
    fn test_known_player_uses_slot_and_name() {
        let store = RallyStore::new();
        let resolution = resolve(&record(0, Some("Alice")), &store);
        assert_eq!(resolution, Resolution::direct(key(0, "Alice")));
    }

    #[test]
    fn test_unknown_player_matches_by_position() {
        let mut store = RallyStore::new();
        store.upsert(&key(0, "Alice"), &record(0, Some("Alice")), Local::now());

        let resolution = resolve(&record(0, None), &store);
        assert_eq!(resolution.key, key(0, "Alice"));
        assert!(resolution.promote_from.is_none());
    }

    #[test]
    fn test_unknown_player_in_empty_slot_gets_slot_key() {
        let mut store = RallyStore::new();
        store.upsert(&key(0, "Alice"), &record(0, Some("Alice")), Local::now());

        let resolution = resolve(&record(1, None), &store);
        assert_eq!(resolution.key, IdentityKey::Slot(1));
    }

    #[test]
    fn test_different_known_player_is_replacement() {
        let mut store = RallyStore::new();
        store.upsert(&key(0, "Alice"), &record(0, Some("Alice")), Local::now());

        let resolution = resolve(&record(0, Some("Bob")), &store);
        assert_eq!(resolution, Resolution::direct(key(0, "Bob")));
    }

    #[test]
    fn test_known_player_promotes_nameless_rally() {
        let mut store = RallyStore::new();
        store.upsert(&IdentityKey::Slot(2), &record(2, None), Local::now());

        let resolution = resolve(&record(2, Some("Carol")), &store);
        assert_eq!(resolution.key, key(2, "Carol"));
        assert_eq!(resolution.promote_from, Some(IdentityKey::Slot(2)));
    }

    #[test]
    fn test_same_player_in_other_slot_is_distinct() {
        let mut store = RallyStore::new();
        store.upsert(&key(0, "Alice"), &record(0, Some("Alice")), Local::now());

        let resolution = resolve(&record(1, Some("Alice")), &store);
        assert_eq!(resolution.key, key(1, "Alice"));
    }
}
