//! Build-time configuration for the ESP32 firmware.
//!
//! Credentials are baked in from the build environment so they never live
//! in the source tree:
//!
//! ```text
//! WIFI_SSID=mynet WIFI_PASS=secret cargo build --release
//! ```

use camstream_core::{CameraConfig, FirmwareConfig, FirmwareVariant, Resolution, StreamConfig};

/// HTTP server port.
pub const HTTP_PORT: u16 = 80;

/// Wi-Fi credentials captured at compile time.
#[derive(Debug, Clone, Copy)]
pub struct WifiCredentials {
    pub ssid: &'static str,
    /// Empty for open networks.
    pub password: &'static str,
}

impl WifiCredentials {
    pub fn from_build_env() -> Self {
        Self {
            ssid: option_env!("WIFI_SSID").unwrap_or(""),
            password: option_env!("WIFI_PASS").unwrap_or(""),
        }
    }
}

/// Firmware settings for this build.
///
/// `CAMSTREAM_VARIANT=snapshot` at build time selects the polling page and
/// leaves `/stream` unregistered.
pub fn firmware_config() -> FirmwareConfig {
    let variant = match option_env!("CAMSTREAM_VARIANT") {
        Some("snapshot") => FirmwareVariant::Snapshot,
        _ => FirmwareVariant::Stream,
    };

    FirmwareConfig {
        variant,
        stream: StreamConfig::default(),
        camera: CameraConfig {
            initial_resolution: Resolution::High,
            jpeg_quality: 12,
            frame_buffers: 2,
        },
        restart_delay_ms: 5_000,
    }
}
