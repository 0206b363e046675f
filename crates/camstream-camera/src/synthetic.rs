//! Synthetic test-pattern camera.
//!
//! Each preset gets a short ring of pre-encoded JPEGs showing a bar that
//! moves across a gradient. Rings are rendered the first time a preset is
//! selected and reused afterwards, so capture cost stays flat.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use camstream_core::{CameraConfig, CameraDriver, CameraError, Resolution};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use tracing::{debug, info};

/// Settings for [`SyntheticCamera`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub camera: CameraConfig,

    /// Distinct frames per preset.
    pub ring_len: usize,

    /// Fail every capture after this many have succeeded.
    pub fail_after: Option<u64>,

    /// Reject every resolution change.
    pub fail_resolution_change: bool,

    /// Simulated sensor time per capture.
    pub capture_delay: Duration,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            ring_len: 8,
            fail_after: None,
            fail_resolution_change: false,
            capture_delay: Duration::ZERO,
        }
    }
}

pub struct SyntheticCamera {
    config: SyntheticConfig,
    resolution: Resolution,
    rings: HashMap<Resolution, Vec<Vec<u8>>>,
    captured: u64,
}

impl SyntheticCamera {
    /// Validate the configuration and render the initial preset.
    pub fn begin(config: SyntheticConfig) -> Result<Self, CameraError> {
        config
            .camera
            .validate()
            .map_err(|e| CameraError::Init(e.to_string()))?;
        if config.ring_len == 0 {
            return Err(CameraError::Init("ring length must be at least 1".into()));
        }

        let resolution = config.camera.initial_resolution;
        let mut camera = Self {
            config,
            resolution,
            rings: HashMap::new(),
            captured: 0,
        };
        camera
            .ensure_ring(resolution)
            .map_err(|e| CameraError::Init(e.to_string()))?;

        info!(%resolution, ring_len = camera.config.ring_len, "synthetic camera ready");
        Ok(camera)
    }

    /// Number of successful captures so far.
    pub fn captured(&self) -> u64 {
        self.captured
    }

    fn ensure_ring(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        if self.rings.contains_key(&resolution) {
            return Ok(());
        }
        let quality = encoder_quality(self.config.camera.jpeg_quality);
        let ring = (0..self.config.ring_len)
            .map(|index| render_frame(resolution, index, self.config.ring_len, quality))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CameraError::ResolutionChange {
                resolution,
                reason: e.to_string(),
            })?;
        debug!(%resolution, frames = ring.len(), "rendered test pattern");
        self.rings.insert(resolution, ring);
        Ok(())
    }
}

impl CameraDriver for SyntheticCamera {
    type Frame = Vec<u8>;

    fn change_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        if self.config.fail_resolution_change {
            return Err(CameraError::ResolutionChange {
                resolution,
                reason: "simulated sensor fault".into(),
            });
        }
        self.ensure_ring(resolution)?;
        self.resolution = resolution;
        Ok(())
    }

    fn capture(&mut self) -> Result<Vec<u8>, CameraError> {
        if let Some(limit) = self.config.fail_after {
            if self.captured >= limit {
                return Err(CameraError::CaptureFailed(format!(
                    "simulated failure after {limit} frames"
                )));
            }
        }
        if !self.config.capture_delay.is_zero() {
            thread::sleep(self.config.capture_delay);
        }

        let ring = self
            .rings
            .get(&self.resolution)
            .ok_or_else(|| CameraError::CaptureFailed("no frames for active resolution".into()))?;
        let frame = ring[(self.captured % ring.len() as u64) as usize].clone();
        self.captured += 1;
        Ok(frame)
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }
}

/// Map sensor quality (0-63, lower is better) to encoder quality (1-100).
fn encoder_quality(sensor_quality: u8) -> u8 {
    let scaled = 100 - u32::from(sensor_quality.min(63)) * 100 / 63;
    scaled.clamp(1, 100) as u8
}

fn render_frame(
    resolution: Resolution,
    index: usize,
    ring_len: usize,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let (width, height) = (resolution.width(), resolution.height());
    let bar_width = (width / 10).max(1);
    let bar_x = (width as usize * index / ring_len) as u32;

    let img = RgbImage::from_fn(width, height, |x, y| {
        if x >= bar_x && x < bar_x + bar_width {
            Rgb([255, 255, 255])
        } else {
            Rgb([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                (index * 255 / ring_len) as u8,
            ])
        }
    });

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(&img)?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_config() -> SyntheticConfig {
        SyntheticConfig {
            camera: CameraConfig {
                initial_resolution: Resolution::Low,
                ..CameraConfig::default()
            },
            ring_len: 3,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn test_frames_are_jpeg_and_cycle() {
        let mut camera = SyntheticCamera::begin(small_config()).unwrap();

        let frames: Vec<Vec<u8>> = (0..4).map(|_| camera.capture().unwrap()).collect();

        for frame in &frames {
            assert_eq!(&frame[..2], &[0xFF, 0xD8]);
            assert_eq!(&frame[frame.len() - 2..], &[0xFF, 0xD9]);
        }
        assert_ne!(frames[0], frames[1]);
        assert_eq!(frames[0], frames[3]);
        assert_eq!(camera.captured(), 4);
    }

    #[test]
    fn test_resolution_change_renders_new_size() {
        let mut camera = SyntheticCamera::begin(small_config()).unwrap();
        let low = camera.capture().unwrap();

        camera.change_resolution(Resolution::High).unwrap();
        let high = camera.capture().unwrap();

        assert_eq!(camera.resolution(), Resolution::High);
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_fault_injection() {
        let mut camera = SyntheticCamera::begin(SyntheticConfig {
            fail_after: Some(2),
            fail_resolution_change: true,
            ..small_config()
        })
        .unwrap();

        assert!(camera.change_resolution(Resolution::Mid).is_err());
        assert_eq!(camera.resolution(), Resolution::Low);
        assert!(camera.capture().is_ok());
        assert!(camera.capture().is_ok());
        assert!(matches!(
            camera.capture(),
            Err(CameraError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_invalid_config_fails_init() {
        let mut config = small_config();
        config.camera.frame_buffers = 0;
        assert!(matches!(
            SyntheticCamera::begin(config),
            Err(CameraError::Init(_))
        ));
    }

    #[test]
    fn test_encoder_quality_mapping() {
        assert_eq!(encoder_quality(0), 100);
        assert_eq!(encoder_quality(63), 1);
        assert_eq!(encoder_quality(12), 81);
    }
}
