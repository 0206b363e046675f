//! Firmware configuration.
//!
//! These types are shared by every platform:
//! - Linux: loaded from an optional JSON file, then overridden by CLI/env
//! - ESP32: built from compile-time defaults
//!
//! Every field has a default so partial files deserialize cleanly.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::page::FirmwareVariant;
use crate::resolution::Resolution;

/// Highest frame rate the stream accepts.
pub const MAX_FPS: u32 = 60;

/// Errors that can occur while validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Frame rate outside `1..=MAX_FPS`.
    #[error("fps must be between 1 and {MAX_FPS}, got {0}")]
    InvalidFps(u32),

    /// Stream chunk size of zero.
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    /// JPEG quality outside the sensor's `0..=63` range.
    #[error("jpeg quality must be between 0 and 63, got {0}")]
    InvalidJpegQuality(u8),

    /// Zero frame buffers requested.
    #[error("at least one frame buffer is required")]
    NoFrameBuffers,
}

/// Top-level configuration for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FirmwareConfig {
    /// Which index page (and whether `/stream`) is served.
    pub variant: FirmwareVariant,

    /// MJPEG stream pacing and framing.
    pub stream: StreamConfig,

    /// Camera driver settings.
    pub camera: CameraConfig,

    /// Delay before restarting after a fatal boot error.
    pub restart_delay_ms: u64,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            variant: FirmwareVariant::Stream,
            stream: StreamConfig::default(),
            camera: CameraConfig::default(),
            restart_delay_ms: 5_000,
        }
    }
}

impl FirmwareConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Check every section for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stream.validate()?;
        self.camera.validate()
    }
}

/// MJPEG stream settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamConfig {
    /// Target frames per second.
    pub fps: u32,

    /// Maximum bytes per body write.
    pub chunk_size: usize,

    /// Longest sleep between pacing checks.
    pub poll_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            chunk_size: 1024,
            poll_interval_ms: 1,
        }
    }
}

impl StreamConfig {
    /// Minimum spacing between part starts (`1000 / fps` whole milliseconds).
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }
}

/// Camera driver settings applied by `begin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfig {
    /// Resolution selected at init.
    pub initial_resolution: Resolution,

    /// JPEG quality, 0-63, lower is better.
    pub jpeg_quality: u8,

    /// Number of driver frame buffers.
    pub frame_buffers: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_resolution: Resolution::High,
            jpeg_quality: 12,
            frame_buffers: 2,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jpeg_quality > 63 {
            return Err(ConfigError::InvalidJpegQuality(self.jpeg_quality));
        }
        if self.frame_buffers == 0 {
            return Err(ConfigError::NoFrameBuffers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_frame_interval() {
        let config = StreamConfig::default();
        assert_eq!(config.frame_interval(), Duration::from_millis(33));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"stream":{"fps":15},"variant":"snapshot"}"#;
        let config: FirmwareConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.stream.fps, 15);
        assert_eq!(config.stream.chunk_size, 1024);
        assert_eq!(config.variant, FirmwareVariant::Snapshot);
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.restart_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        assert!(FirmwareConfig::default().validate().is_ok());

        let mut config = FirmwareConfig::default();
        config.stream.fps = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFps(0)));

        config.stream.fps = 30;
        config.stream.chunk_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));

        config.stream.chunk_size = 512;
        config.camera.jpeg_quality = 64;
        assert_eq!(config.validate(), Err(ConfigError::InvalidJpegQuality(64)));
    }
}
