//! Camera driver abstraction.
//!
//! This module provides the trait every camera backend implements:
//! - ESP32: the esp32-camera component (`EspCamera`)
//! - Linux: synthetic and directory-replay cameras
//!
//! Backends are constructed by their own `begin(..)` function; a failure
//! there is a boot error and the device restarts.

use crate::resolution::Resolution;
use thiserror::Error;

/// Errors reported by a camera driver.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The driver could not be initialised.
    #[error("camera init failed: {0}")]
    Init(String),

    /// The driver returned no frame.
    #[error("frame capture failed: {0}")]
    CaptureFailed(String),

    /// No frame became available in time.
    #[error("frame capture timed out")]
    Timeout,

    /// The sensor rejected a resolution change.
    #[error("cannot switch to {resolution}: {reason}")]
    ResolutionChange {
        resolution: Resolution,
        reason: String,
    },

    /// The backend does not support the operation.
    #[error("unsupported camera operation: {0}")]
    Unsupported(&'static str),
}

/// A camera that captures JPEG frames at one of the fixed presets.
///
/// Frames are owned by the caller until dropped. Dropping a frame hands its
/// buffer back to the driver's pool, so every early-exit path releases it.
///
/// All methods are synchronous to support embedded platforms.
pub trait CameraDriver {
    /// One captured JPEG image.
    type Frame: AsRef<[u8]>;

    /// Apply a resolution preset before the next capture.
    fn change_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError>;

    /// Capture one frame at the active resolution.
    fn capture(&mut self) -> Result<Self::Frame, CameraError>;

    /// Resolution the sensor is currently configured for.
    fn resolution(&self) -> Resolution;
}

impl<C: CameraDriver + ?Sized> CameraDriver for Box<C> {
    type Frame = C::Frame;

    fn change_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        (**self).change_resolution(resolution)
    }

    fn capture(&mut self) -> Result<Self::Frame, CameraError> {
        (**self).capture()
    }

    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }
}
