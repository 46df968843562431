//! Record and entity types shared by the tracking pipeline.
//!
//! Raw records come out of OCR, normalized records come out of the
//! normalizer, and tracked rallies live in the store.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text read from one slot region, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSlotRecord {
    /// Slot position on screen (0 = top)
    pub slot_index: usize,
    pub player_text: String,
    pub target_text: String,
    pub status_text: String,
}

impl RawSlotRecord {
    pub fn new(
        slot_index: usize,
        player_text: impl Into<String>,
        target_text: impl Into<String>,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            slot_index,
            player_text: player_text.into(),
            target_text: target_text.into(),
            status_text: status_text.into(),
        }
    }
}

/// A text field that either holds a cleaned, non-empty value or is explicitly unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Known(String),
    Unknown,
}

impl Field {
    /// Wraps a cleaned string, mapping the empty string to `Unknown`.
    pub fn from_cleaned(text: String) -> Self {
        if text.is_empty() {
            Field::Unknown
        } else {
            Field::Known(text)
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Field::Known(_))
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            Field::Known(s) => Some(s),
            Field::Unknown => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Known(s) => write!(f, "{}", s),
            Field::Unknown => write!(f, "unknown"),
        }
    }
}

/// Rally status as shown under each rally entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RallyStatus {
    Preparing,
    Marching,
    Battling,
    Returning,
    Unknown,
}

impl RallyStatus {
    /// Lowercase label used for matching OCR text and in config files.
    pub fn label(&self) -> &'static str {
        match self {
            RallyStatus::Preparing => "preparing",
            RallyStatus::Marching => "marching",
            RallyStatus::Battling => "battling",
            RallyStatus::Returning => "returning",
            RallyStatus::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != RallyStatus::Unknown
    }
}

impl fmt::Display for RallyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RallyStatus::Preparing => write!(f, "Preparing"),
            RallyStatus::Marching => write!(f, "Marching"),
            RallyStatus::Battling => write!(f, "Battling"),
            RallyStatus::Returning => write!(f, "Returning"),
            RallyStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Cleaned record for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub slot_index: usize,
    pub player: Field,
    pub target: Field,
    pub status: RallyStatus,
}

/// Stable identity of a tracked rally.
///
/// `Player` is the normal case. `Slot` is used for a rally whose player
/// name has not been read yet; it is promoted to `Player` once it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    Player { slot: usize, player: String },
    Slot(usize),
}

impl IdentityKey {
    pub fn slot(&self) -> usize {
        match self {
            IdentityKey::Player { slot, .. } => *slot,
            IdentityKey::Slot(slot) => *slot,
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Player { slot, player } => write!(f, "slot {} / {}", slot + 1, player),
            IdentityKey::Slot(slot) => write!(f, "slot {} / unknown", slot + 1),
        }
    }
}

/// A rally currently considered active.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedRally {
    pub key: IdentityKey,
    pub player: Field,
    pub target: Field,
    pub status: RallyStatus,
    pub slot_index: usize,
    pub first_seen_at: DateTime<Local>,
    pub last_seen_at: DateTime<Local>,
    pub last_status_change_at: DateTime<Local>,
}

/// Lifecycle transition produced by one scan cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RallyEvent {
    New(TrackedRally),
    StatusChanged {
        rally: TrackedRally,
        previous: RallyStatus,
    },
    Completed(TrackedRally),
}

impl RallyEvent {
    pub fn rally(&self) -> &TrackedRally {
        match self {
            RallyEvent::New(rally) => rally,
            RallyEvent::StatusChanged { rally, .. } => rally,
            RallyEvent::Completed(rally) => rally,
        }
    }

    /// Short kind name, used in the event log.
    pub fn kind(&self) -> &'static str {
        match self {
            RallyEvent::New(_) => "new",
            RallyEvent::StatusChanged { .. } => "status_changed",
            RallyEvent::Completed(_) => "completed",
        }
    }
}
