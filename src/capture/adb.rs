//! ADB device discovery and `screencap` capture.
//!
//! Talks to the ADB server through the `adb` executable, the same way the
//! OCR module drives `tesseract`.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use log::{debug, info};
use std::process::{Command, Output};

use super::{CaptureError, ImageSource};
use crate::config::AdbConfig;

/// One line of `adb devices` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub serial: String,
    /// "device", "offline", "unauthorized", ...
    pub state: String,
}

impl DeviceEntry {
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

/// A connected device that frames are captured from.
#[derive(Debug, Clone)]
pub struct AdbDevice {
    serial: String,
    config: AdbConfig,
}

impl AdbDevice {
    pub fn serial(&self) -> &str {
        &self.serial
    }

    fn command(&self) -> Command {
        let mut cmd = adb_command(&self.config);
        cmd.arg("-s").arg(&self.serial);
        cmd
    }
}

impl ImageSource for AdbDevice {
    /// Captures the device screen as PNG via `exec-out screencap -p`.
    fn capture(&mut self) -> Result<RgbaImage, CaptureError> {
        let output = self
            .command()
            .args(["exec-out", "screencap", "-p"])
            .output()?;

        if !output.status.success() {
            return Err(CaptureError::DeviceUnavailable {
                serial: self.serial.clone(),
                message: stderr_message(&output),
            });
        }
        if output.stdout.is_empty() {
            return Err(CaptureError::EmptyFrame);
        }

        let img = image::load_from_memory(&output.stdout)?.to_rgba8();
        debug!("Captured {}x{} frame from {}", img.width(), img.height(), self.serial);
        Ok(img)
    }
}

/// Base adb command pointed at the configured server.
fn adb_command(config: &AdbConfig) -> Command {
    let mut cmd = Command::new(&config.executable);
    cmd.arg("-H")
        .arg(&config.host)
        .arg("-P")
        .arg(config.port.to_string());
    cmd
}

fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("adb exited with {}", output.status)
    } else {
        stderr
    }
}

/// Parses `adb devices` output, skipping the header and daemon chatter.
pub fn parse_device_list(text: &str) -> Vec<DeviceEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(DeviceEntry {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

/// Lists devices known to the ADB server.
pub fn list_devices(config: &AdbConfig) -> Result<Vec<DeviceEntry>> {
    let output = adb_command(config)
        .arg("devices")
        .output()
        .with_context(|| format!("Failed to run '{}'. Is adb installed?", config.executable))?;

    if !output.status.success() {
        return Err(anyhow!(
            "adb devices failed: {}. Make sure the ADB server is running ('adb start-server').",
            stderr_message(&output)
        ));
    }

    Ok(parse_device_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Picks the device to monitor from a device list.
///
/// Uses the configured serial when set, otherwise the first ready device.
pub fn select_device(devices: &[DeviceEntry], serial: Option<&str>) -> Result<DeviceEntry> {
    match serial {
        Some(wanted) => {
            let entry = devices
                .iter()
                .find(|d| d.serial == wanted)
                .ok_or_else(|| anyhow!("Device {} is not connected", wanted))?;
            if !entry.is_ready() {
                return Err(anyhow!("Device {} is {}", entry.serial, entry.state));
            }
            Ok(entry.clone())
        }
        None => devices
            .iter()
            .find(|d| d.is_ready())
            .cloned()
            .ok_or_else(|| anyhow!("No devices connected. Please ensure your emulator is running.")),
    }
}

/// Connects to the configured ADB server and returns the device to monitor.
pub fn connect_device(config: &AdbConfig) -> Result<AdbDevice> {
    let devices = list_devices(config)?;
    let entry = select_device(&devices, config.serial.as_deref())?;
    info!("Connected to device: {}", entry.serial);

    Ok(AdbDevice {
        serial: entry.serial,
        config: config.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICES_OUTPUT: &str = "\
* daemon not running; starting now at tcp:5037
* daemon started successfully
List of devices attached
emulator-5554\tdevice
127.0.0.1:5555\toffline

";

    #[test]
    fn test_parse_device_list() {
        let devices = parse_device_list(DEVICES_OUTPUT);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert!(devices[0].is_ready());
        assert_eq!(devices[1].state, "offline");
    }

    #[test]
    fn test_parse_empty_device_list() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn test_select_first_ready_device() {
        let mut devices = parse_device_list(DEVICES_OUTPUT);
        devices.reverse();
        let selected = select_device(&devices, None).unwrap();
        assert_eq!(selected.serial, "emulator-5554");
    }

    #[test]
    fn test_select_configured_serial() {
        let devices = parse_device_list(DEVICES_OUTPUT);
        assert!(select_device(&devices, Some("emulator-5554")).is_ok());
        assert!(select_device(&devices, Some("127.0.0.1:5555")).is_err());
        assert!(select_device(&devices, Some("missing")).is_err());
    }

    #[test]
    fn test_select_with_no_devices() {
        assert!(select_device(&[], None).is_err());
    }
}
