//! camstream firmware for the AI-Thinker ESP32-CAM.
//!
//! This binary requires the ESP32 Rust toolchain (`espup`) and builds with:
//!
//! ```text
//! WIFI_SSID=mynet WIFI_PASS=secret cargo build --release
//! ```
//!
//! Boot order: camera, Wi-Fi, HTTP server. A camera or network failure is
//! fatal and reboots the chip after the configured delay.

use std::sync::Arc;

use anyhow::Result;
use camstream_core::{Device, FirmwareConfig};
use camstream_esp32::camera::EspCamera;
use camstream_esp32::config::{firmware_config, WifiCredentials, HTTP_PORT};
use camstream_esp32::{http, restart, wifi};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use log::{error, info};

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = firmware_config();
    info!("camstream ESP32 starting ({:?} variant)", config.variant);

    if let Err(e) = run(&config) {
        error!("Fatal: {:#}", e);
    }
    restart(config.restart_delay());
}

fn run(config: &FirmwareConfig) -> Result<()> {
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    let camera = EspCamera::begin(&config.camera)?;

    let credentials = WifiCredentials::from_build_env();
    let (_wifi, ip) = wifi::connect_wifi(&credentials, peripherals.modem, sysloop)?;

    let device = Arc::new(Device::new(camera));
    let _server = http::start_server(device, config)?;

    info!("🚀 camstream ready!");
    info!("   Index:  http://{}:{}/", ip, HTTP_PORT);
    info!("   Frame:  http://{}:{}/cam-lo.jpg", ip, HTTP_PORT);
    if config.variant.serves_stream() {
        info!("   Stream: http://{}:{}/stream", ip, HTTP_PORT);
    }

    // Handlers run on the httpd task; keep Wi-Fi and the server alive.
    loop {
        FreeRtos::delay_ms(1000);
    }
}
