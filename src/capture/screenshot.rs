//! Saving captured frames to disk.

use anyhow::{Context, Result};
use chrono::Local;
use image::RgbaImage;
use log::debug;
use std::path::{Path, PathBuf};

/// Saves a frame as `rally_screen_YYYYMMDD_HHMMSS.png` in `dir`.
///
/// Returns the path to the saved screenshot file.
pub fn save_screenshot(img: &RgbaImage, dir: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("rally_screen_{}.png", timestamp);
    let path = dir.join(&filename);

    img.save(&path)
        .with_context(|| format!("Failed to save screenshot to {}", path.display()))?;
    debug!("Screenshot saved: {}", path.display());

    Ok(path)
}
