//! WiFi connection utilities for ESP32.

use std::net::Ipv4Addr;

use anyhow::{anyhow, bail, Result};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{delay::FreeRtos, peripheral},
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};
use log::{info, warn};

use crate::config::WifiCredentials;

/// Connection attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 20;

/// Pause between attempts.
pub const RETRY_DELAY_MS: u32 = 500;

/// Join the configured network and wait for a DHCP lease.
///
/// Scans first so the connect can target the right channel, then retries
/// `connect` + `wait_netif_up` up to [`MAX_ATTEMPTS`] times. Exhausting the
/// retries is a fatal boot error; the caller restarts the chip.
///
/// The returned `EspWifi` must be kept alive for the connection to remain up.
pub fn connect_wifi(
    credentials: &WifiCredentials,
    modem: impl peripheral::Peripheral<P = esp_idf_svc::hal::modem::Modem> + 'static,
    sysloop: EspSystemEventLoop,
) -> Result<(Box<EspWifi<'static>>, Ipv4Addr)> {
    let ssid = credentials.ssid;
    let password = credentials.password;
    if ssid.is_empty() {
        bail!("WiFi SSID cannot be empty (set WIFI_SSID at build time)");
    }

    let auth_method = if password.is_empty() {
        info!("WiFi password is empty, using open network");
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), None)?;
    let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sysloop)?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
    wifi.start()?;

    info!("Scanning for WiFi networks...");
    let channel = wifi
        .scan()?
        .into_iter()
        .find(|ap| ap.ssid == ssid)
        .map(|ap| {
            info!("Found '{}' on channel {}", ssid, ap.channel);
            ap.channel
        });
    if channel.is_none() {
        info!("Network '{}' not found in scan, will try anyway", ssid);
    }

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid
            .try_into()
            .map_err(|_| anyhow!("SSID too long (max 32 chars)"))?,
        password: password
            .try_into()
            .map_err(|_| anyhow!("Password too long (max 64 chars)"))?,
        channel,
        auth_method,
        ..Default::default()
    }))?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        info!("Connecting to '{}' (attempt {}/{})...", ssid, attempt, MAX_ATTEMPTS);
        match wifi.connect().and_then(|_| wifi.wait_netif_up()) {
            Ok(()) => break,
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!("WiFi connect failed: {}", e);
                let _ = wifi.disconnect();
                FreeRtos::delay_ms(RETRY_DELAY_MS);
            }
            Err(e) => bail!("WiFi connect failed after {} attempts: {}", attempt, e),
        }
    }

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi connected!");
    info!("  IP address: {}", ip_info.ip);
    info!("  Gateway:    {}", ip_info.subnet.gateway);

    Ok((Box::new(esp_wifi), ip_info.ip))
}
