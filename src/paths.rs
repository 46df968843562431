use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the session output directory: `<exe_dir>/output/`
pub fn get_output_dir() -> PathBuf {
    get_exe_dir().join("output")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_output_dir())?;
    Ok(())
}

/// Creates a timestamped session folder: `<exe_dir>/output/YYYYMMDD_HHMMSS/`
/// with a `screenshots/` subfolder, and returns its path.
pub fn create_session_dir() -> std::io::Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let session_dir = get_output_dir().join(timestamp);
    std::fs::create_dir_all(session_screenshots_dir(&session_dir))?;
    Ok(session_dir)
}

/// Returns the screenshot folder inside a session folder.
pub fn session_screenshots_dir(session_dir: &std::path::Path) -> PathBuf {
    session_dir.join("screenshots")
}
