//! Configuration for the rally monitor.
//!
//! Loads settings from config.json at startup. Provides the ADB connection,
//! slot regions, status vocabulary and scan timing.

use anyhow::{anyhow, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rally::RallyStatus;

const CONFIG_FILE_NAME: &str = "config.json";

/// A rectangle in relative coordinates (0.0 to 1.0).
/// Used for defining screen regions that scale with the device resolution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of screen width
    pub width: f32,
    /// Height as fraction of screen height
    pub height: f32,
}

impl RelativeRect {
    /// Full-width band between two vertical fractions.
    pub fn band(y_start: f32, y_end: f32) -> Self {
        Self {
            x: 0.0,
            y: y_start,
            width: 1.0,
            height: y_end - y_start,
        }
    }

    fn is_valid(&self) -> bool {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        in_unit(self.x)
            && in_unit(self.y)
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + f32::EPSILON
            && self.y + self.height <= 1.0 + f32::EPSILON
    }
}

/// How to reach the ADB server and which device to use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdbConfig {
    /// adb executable name or path
    pub executable: String,
    /// ADB server host
    pub host: String,
    /// ADB server port
    pub port: u16,
    /// Device serial; the first attached device is used when unset
    pub serial: Option<String>,
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            executable: "adb".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5037,
            serial: None,
        }
    }
}

/// Complete monitor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between scans
    pub scan_interval_secs: u64,
    /// Log rally statistics every N scans
    pub stats_every_scans: u32,
    /// Save each captured frame to the session's screenshot folder
    pub save_screenshots: bool,
    /// Append every rally event to events.csv in the session folder
    pub write_event_log: bool,
    /// Minimum log level (error, warn, info, debug, trace)
    pub log_level: String,
    pub adb: AdbConfig,
    /// Explicit tesseract executable; searched for when unset
    pub tesseract_path: Option<PathBuf>,
    /// Tesseract language
    pub ocr_language: String,
    /// One region per rally slot, top to bottom
    pub slot_regions: Vec<RelativeRect>,
    /// Recognized statuses, in matching order
    pub status_vocabulary: Vec<RallyStatus>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 30,
            stats_every_scans: 5,
            save_screenshots: true,
            write_event_log: true,
            log_level: "info".to_string(),
            adb: AdbConfig::default(),
            tesseract_path: None,
            ocr_language: "eng".to_string(),
            // Three rallies stacked vertically on the War screen
            slot_regions: vec![
                RelativeRect::band(0.15, 0.35),
                RelativeRect::band(0.40, 0.60),
                RelativeRect::band(0.65, 0.85),
            ],
            status_vocabulary: vec![
                RallyStatus::Preparing,
                RallyStatus::Marching,
                RallyStatus::Battling,
                RallyStatus::Returning,
            ],
        }
    }
}

impl MonitorConfig {
    /// Loads configuration from config.json or returns defaults.
    /// Looks next to the executable first, then in the working directory.
    pub fn load() -> MonitorConfig {
        let candidates = [
            crate::paths::get_exe_dir().join(CONFIG_FILE_NAME),
            PathBuf::from(CONFIG_FILE_NAME),
        ];

        match candidates.iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(path),
            None => {
                info!("config.json not found. Using default config.");
                MonitorConfig::default()
            }
        }
    }

    /// Loads configuration from a specific file, falling back to defaults on error.
    pub fn load_from(path: &Path) -> MonitorConfig {
        info!("Loading config from: {}", path.display());

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    MonitorConfig::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                MonitorConfig::default()
            }
        }
    }

    /// Checks values the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            return Err(anyhow!("scan_interval_secs must be at least 1"));
        }
        if self.slot_regions.is_empty() {
            return Err(anyhow!("slot_regions must contain at least one region"));
        }
        if let Some(idx) = self.slot_regions.iter().position(|r| !r.is_valid()) {
            return Err(anyhow!(
                "slot_regions[{}] is outside the 0.0-1.0 screen area: {:?}",
                idx,
                self.slot_regions[idx]
            ));
        }
        if self.status_vocabulary.is_empty() {
            return Err(anyhow!("status_vocabulary must not be empty"));
        }
        if self.status_vocabulary.contains(&RallyStatus::Unknown) {
            return Err(anyhow!("status_vocabulary must not contain \"unknown\""));
        }
        Ok(())
    }

    pub fn slot_count(&self) -> usize {
        self.slot_regions.len()
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}
