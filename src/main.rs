//! Rally Monitor
//!
//! Watches the rally list of a mobile strategy game running in an Android
//! emulator. Every scan captures the screen over ADB, reads each rally slot
//! with Tesseract and reports rallies that start, change status or finish,
//! along with how many rallies each player has initiated.

mod capture;
mod config;
mod logging;
mod monitor;
mod ocr;
mod paths;
mod rally;

use anyhow::{Context, Result};
use log::{error, info};

use crate::config::MonitorConfig;
use crate::monitor::{
    CsvEventLog, LogReporter, MonitorSettings, RallyMonitor, STOP_REQUESTED,
};
use crate::ocr::{RallyTextParser, SlotExtractor, Tesseract};
use crate::rally::{RallyTracker, StatusVocabulary};

fn main() {
    logging::install_panic_hook();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Ensure output directories exist before the log file is opened
    let directories = paths::ensure_directories();
    logging::init(log::LevelFilter::Info);
    directories.context("Failed to create output directories")?;

    info!("=== Rally Monitor ===");

    // Load configuration
    let config = MonitorConfig::load();
    config.validate().context("Invalid configuration")?;
    log::set_max_level(config.log_level_filter());

    let tesseract_paths = ocr::ensure_tesseract(config.tesseract_path.as_deref(), &config.ocr_language)
        .context("Tesseract is required for rally OCR")?;

    let vocabulary = StatusVocabulary::new(&config.status_vocabulary);
    info!(
        "{} rally slot(s), statuses: {:?}",
        config.slot_count(),
        vocabulary.statuses()
    );
    let parser = RallyTextParser::new(vocabulary.clone()).context("Failed to build text parser")?;
    let extractor = SlotExtractor::new(
        config.slot_regions.clone(),
        Tesseract::new(tesseract_paths, config.ocr_language.clone()),
        parser,
    );

    let device = capture::connect_device(&config.adb)?;
    info!("Capturing from {} every {}s", device.serial(), config.scan_interval_secs);

    let session_dir = paths::create_session_dir().context("Failed to create session directory")?;
    info!("Session folder: {}", session_dir.display());

    let settings = MonitorSettings::from_config(
        &config,
        Some(paths::session_screenshots_dir(&session_dir)),
    );
    let mut monitor = RallyMonitor::new(device, extractor, RallyTracker::new(vocabulary), settings);
    monitor.add_reporter(Box::new(LogReporter));

    if config.write_event_log {
        let event_log = CsvEventLog::create(&session_dir)?;
        info!("Event log: {}", event_log.path().display());
        monitor.add_reporter(Box::new(event_log));
    }

    monitor::install_stop_handler().context("Failed to install Ctrl+C handler")?;
    monitor.run(&STOP_REQUESTED);

    info!("Rally monitor stopped");
    log::logger().flush();
    Ok(())
}
