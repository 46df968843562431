//! Rally state tracking.
//!
//! This module provides:
//! - Record normalization (OCR cleanup and status vocabulary)
//! - Identity resolution that tolerates single-field misreads
//! - The rally store with per-player counters
//! - The per-scan tracker that turns record batches into lifecycle events

pub mod identity;
pub mod normalize;
pub mod record;
pub mod store;
pub mod tracker;

pub use normalize::StatusVocabulary;
pub use record::{RallyEvent, RallyStatus, RawSlotRecord, TrackedRally};
pub use store::RallyStore;
pub use tracker::RallyTracker;
