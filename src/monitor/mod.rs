//! Monitoring loop, event reporting and the stop signal.

pub mod event_log;
pub mod report;
pub mod runner;

pub use event_log::CsvEventLog;
pub use report::LogReporter;
pub use runner::{MonitorSettings, RallyMonitor};

use std::sync::atomic::{AtomicBool, Ordering};

/// Global stop flag - set by the Ctrl+C handler.
pub static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Requests the monitor loop to stop before its next scan.
pub fn request_stop() {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs a Ctrl+C handler that requests a stop.
pub fn install_stop_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        log::info!("Stop requested, finishing current scan...");
        request_stop();
    })?;
    Ok(())
}
