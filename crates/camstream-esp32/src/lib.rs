//! ESP32-CAM components for camstream.
//!
//! This crate provides the hardware side of the firmware:
//! - Wi-Fi join with bounded retries
//! - Build-time configuration and credentials
//! - [`camera::EspCamera`], the `esp32-camera` driver behind
//!   [`camstream_core::CameraDriver`]
//! - `EspHttpServer` handlers for the index page, snapshots and the stream
//!
//! The camera bindings come from the `espressif/esp32-camera` component,
//! which the firmware binary registers as an ESP-IDF extra component.
//!
//! # Example
//!
//! ```ignore
//! use camstream_esp32::{camera::EspCamera, config, http, wifi};
//!
//! let config = config::firmware_config();
//! let camera = EspCamera::begin(&config.camera)?;
//! let (_wifi, ip) = wifi::connect_wifi(&config::WifiCredentials::from_build_env(), modem, sysloop)?;
//! let _server = http::start_server(Arc::new(Device::new(camera)), &config)?;
//! ```

pub mod camera;
pub mod config;
pub mod http;
pub mod wifi;

use std::time::Duration;

use esp_idf_svc::hal::delay::FreeRtos;
use log::warn;

/// Wait `delay`, then reboot the chip.
pub fn restart(delay: Duration) -> ! {
    warn!("Restarting in {} ms", delay.as_millis());
    FreeRtos::delay_ms(u32::try_from(delay.as_millis()).unwrap_or(u32::MAX));
    esp_idf_svc::hal::reset::restart()
}
