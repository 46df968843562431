//! Operator-facing reporting of rally events and statistics.

use log::info;

use crate::rally::{RallyEvent, RallyStore, TrackedRally};

/// Receives the ordered events of each completed scan cycle.
pub trait Reporter {
    fn report(&mut self, scan: u64, events: &[RallyEvent]);
}

/// Writes events to the log in the bot's block format.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, _scan: u64, events: &[RallyEvent]) {
        for event in events {
            for line in describe_event(event) {
                info!("{}", line);
            }
        }
    }
}

/// Formats one event as the lines shown to the operator.
pub fn describe_event(event: &RallyEvent) -> Vec<String> {
    match event {
        RallyEvent::New(rally) => vec![
            "[NEW RALLY DETECTED]".to_string(),
            format!("  Player: {}", rally.player),
            format!("  Target: {}", rally.target),
            format!("  Status: {}", rally.status),
            format!("  Slot: {}", rally.slot_index + 1),
            format!("  Time: {}", rally.first_seen_at.format("%H:%M:%S")),
        ],
        RallyEvent::StatusChanged { rally, previous } => vec![
            "[RALLY STATUS UPDATE]".to_string(),
            format!("  Player: {}", rally.player),
            format!("  Old Status: {}", previous),
            format!("  New Status: {}", rally.status),
        ],
        RallyEvent::Completed(rally) => vec![
            "[RALLY COMPLETED/REMOVED]".to_string(),
            format!("  Player: {}", rally.player),
            format!("  Target: {}", rally.target),
            format!("  Active for: {}", active_duration(rally)),
        ],
    }
}

fn active_duration(rally: &TrackedRally) -> String {
    let secs = (rally.last_seen_at - rally.first_seen_at).num_seconds().max(0);
    format!("{}m {:02}s", secs / 60, secs % 60)
}

/// Formats the rally statistics block.
pub fn format_stats(store: &RallyStore) -> Vec<String> {
    let mut lines = vec![
        "=".repeat(60),
        "RALLY STATISTICS".to_string(),
        "=".repeat(60),
        format!("Active Rallies: {}", store.len()),
    ];

    for rally in store.iter() {
        lines.push(format!(
            "  Slot {}: {} -> {} ({})",
            rally.slot_index + 1,
            rally.player,
            rally.target,
            rally.status
        ));
    }

    let ranked = store.ranked_counts();
    if !ranked.is_empty() {
        lines.push("Rallies Initiated by Player:".to_string());
        for (player, count) in ranked {
            lines.push(format!("  {}: {}", player, count));
        }
    }

    lines.push("=".repeat(60));
    lines
}

/// Logs the rally statistics block.
pub fn display_stats(store: &RallyStore) {
    for line in format_stats(store) {
        info!("{}", line);
    }
}
