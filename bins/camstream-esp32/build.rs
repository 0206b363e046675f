//! Build script for the camstream ESP32 firmware.
//!
//! This script sets up the ESP-IDF environment variables needed for compilation.

fn main() {
    embuild::espidf::sysenv::output();
}
