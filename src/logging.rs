//! Console and file logger behind the `log` facade.
//!
//! Every line is written as `[HH:MM:SS.mmm] LEVEL message` to stdout and
//! appended to `<exe_dir>/logs/rally_monitor.log`.

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_FILE_NAME: &str = "rally_monitor.log";

struct MonitorLogger {
    level: LevelFilter,
    file: Mutex<Option<File>>,
}

impl Log for MonitorLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(record.level(), &record.args().to_string());
        print!("{}", line);

        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

fn format_line(level: log::Level, message: &str) -> String {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    format!("[{}] {:<5} {}\n", timestamp, level, message)
}

/// Returns the log file path: `<exe_dir>/logs/rally_monitor.log`
pub fn log_file_path() -> PathBuf {
    crate::paths::get_logs_dir().join(LOG_FILE_NAME)
}

fn open_log_file(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Installs the logger. Safe to call once; later calls only adjust the level.
pub fn init(level: LevelFilter) {
    let logger = MonitorLogger {
        level: LevelFilter::Trace,
        file: Mutex::new(open_log_file(&log_file_path())),
    };

    if log::set_boxed_logger(Box::new(logger)).is_err() {
        log::warn!("Logger already initialized");
    }
    log::set_max_level(level);
}

/// Appends a panic message to the log file even if the logger is not installed.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();

        let line = format!("[PANIC]{} {}\n", location, msg);
        eprint!("{}", line);
        if let Some(mut file) = open_log_file(&log_file_path()) {
            let _ = file.write_all(line.as_bytes());
        }
    }));
}
