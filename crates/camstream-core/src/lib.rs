//! # camstream-core
//!
//! Core of the camera streaming firmware.
//!
//! This crate provides:
//! - Resolution presets and the snapshot path table
//! - The camera driver trait consumed by every platform
//! - The device state object that serialises camera access
//! - MJPEG multipart framing (encoder and incremental decoder)
//! - Frame pacing and the blocking streaming loop
//! - The static index page and firmware configuration
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! making it usable on both Linux (tokio) and ESP32 (esp-idf) targets.

pub mod camera;
pub mod config;
pub mod device;
pub mod mjpeg;
pub mod pacing;
pub mod page;
pub mod resolution;
pub mod snapshot;
pub mod stream;

pub use camera::{CameraDriver, CameraError};
pub use config::{CameraConfig, ConfigError, FirmwareConfig, StreamConfig};
pub use device::Device;
pub use pacing::{Clock, FramePacer, Pace, SystemClock};
pub use page::{index_html, FirmwareVariant};
pub use resolution::Resolution;
pub use snapshot::Snapshot;
pub use stream::{run_stream, StreamEnd, StreamReport, StreamSink};
