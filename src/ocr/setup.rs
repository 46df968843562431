use anyhow::{anyhow, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Where tesseract and its language data were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// None means tesseract's built-in default tessdata location
    pub tessdata: Option<PathBuf>,
}

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

const COMMON_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// Returns the directory for a locally installed tesseract
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rally-monitor")
        .join("tesseract")
}

/// Locates tesseract, checking the configured path, our local dir, PATH and
/// common install locations in that order.
pub fn ensure_tesseract(configured: Option<&Path>, language: &str) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(configured)?;
    let tessdata = find_tessdata_dir(language);

    info!("Tesseract found at: {}", executable.display());
    match &tessdata {
        Some(dir) => info!("Using tessdata: {}", dir.display()),
        None => warn!(
            "{}.traineddata not found locally; relying on tesseract's default tessdata",
            language
        ),
    }

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the tesseract executable
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!(
            "Configured tesseract_path {} does not exist, searching instead",
            path.display()
        );
    }

    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR and add it to PATH, \
         set tesseract_path in config.json, or copy it to: {}",
        get_tesseract_dir().display()
    ))
}

/// Finds a tessdata directory containing `<language>.traineddata`
pub fn find_tessdata_dir(language: &str) -> Option<PathBuf> {
    let traineddata = format!("{}.traineddata", language);
    let has_language = |dir: &Path| dir.join(&traineddata).exists();

    let local_tessdata = get_tesseract_dir().join("tessdata");
    if has_language(&local_tessdata) {
        return Some(local_tessdata);
    }

    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if has_language(&p) {
            return Some(p);
        }
        let p = p.join("tessdata");
        if has_language(&p) {
            return Some(p);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_configured_executable_wins() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join(EXECUTABLE_NAME);
        std::fs::write(&exe, "").unwrap();

        assert_eq!(find_tesseract_executable(Some(&exe)).unwrap(), exe);
    }

    #[test]
    fn test_tesseract_dir_is_app_specific() {
        let dir = get_tesseract_dir();
        assert!(dir.ends_with(Path::new("rally-monitor").join("tesseract")));
    }
}
