//! Screen capture from an Android emulator over ADB.
//!
//! This module provides:
//! - Device discovery (`connect_device`)
//! - Frame capture through the `ImageSource` trait (`AdbDevice`)
//! - Screenshot saving (`save_screenshot`)

pub mod adb;
pub mod screenshot;

use image::RgbaImage;
use thiserror::Error;

pub use adb::connect_device;
pub use screenshot::save_screenshot;

/// Image acquisition failed; the scan cycle is skipped.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to run adb: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("device {serial} unavailable: {message}")]
    DeviceUnavailable { serial: String, message: String },

    #[error("screencap returned no data")]
    EmptyFrame,

    #[error("failed to decode screencap: {0}")]
    Decode(#[from] image::ImageError),
}

/// Anything that can produce a frame of the device screen.
pub trait ImageSource {
    fn capture(&mut self) -> Result<RgbaImage, CaptureError>;
}
