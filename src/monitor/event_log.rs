//! CSV log of rally events.
//!
//! Appends one row per event to `events.csv` in the session folder, opening
//! the file for each write so a crash never loses completed scans.

use anyhow::{Context, Result};
use log::warn;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::report::Reporter;
use crate::rally::RallyEvent;

pub const EVENT_LOG_FILE_NAME: &str = "events.csv";

/// Columns: scan number, event time, event kind, slot (1-based), then the
/// rally fields and the status before a change.
const CSV_HEADER: &str = "scan,timestamp,event,slot,player,target,status,previous_status";

/// Initializes the CSV file with a header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing.
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing event log")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create event log")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write event log header")?;
    Ok(())
}

/// Quotes a field if it holds a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Formats one event as a CSV row (without newline).
pub fn format_row(scan: u64, event: &RallyEvent) -> String {
    let rally = event.rally();
    let (timestamp, previous) = match event {
        RallyEvent::New(r) => (r.first_seen_at, String::new()),
        RallyEvent::StatusChanged { rally: r, previous } => {
            (r.last_status_change_at, previous.to_string())
        }
        RallyEvent::Completed(r) => (r.last_seen_at, String::new()),
    };

    [
        scan.to_string(),
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
        event.kind().to_string(),
        (rally.slot_index + 1).to_string(),
        csv_field(&rally.player.to_string()),
        csv_field(&rally.target.to_string()),
        rally.status.to_string(),
        previous,
    ]
    .join(",")
}

/// Appends the rows of one scan to the CSV file.
pub fn append_events(path: &Path, scan: u64, events: &[RallyEvent]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open event log for append")?;

    for event in events {
        writeln!(file, "{}", format_row(scan, event)).context("Failed to write event row")?;
    }
    Ok(())
}

/// Reporter that records every event in the session's `events.csv`.
#[derive(Debug, Clone)]
pub struct CsvEventLog {
    path: PathBuf,
}

impl CsvEventLog {
    /// Creates the log in `session_dir`, writing the header if needed.
    pub fn create(session_dir: &Path) -> Result<Self> {
        let path = session_dir.join(EVENT_LOG_FILE_NAME);
        init_csv(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reporter for CsvEventLog {
    fn report(&mut self, scan: u64, events: &[RallyEvent]) {
        if let Err(e) = append_events(&self.path, scan, events) {
            warn!("Failed to write event log {}: {:#}", self.path.display(), e);
        }
    }
}
