//! Directory replay camera.
//!
//! Loads every `*.jpg` / `*.jpeg` file of a directory at `begin` and serves
//! them in file-name order, looping forever. Files cannot be rescaled, so
//! any resolution change other than the configured one is refused and the
//! device keeps serving at the configured preset.

use std::fs;
use std::path::{Path, PathBuf};

use camstream_core::{CameraConfig, CameraDriver, CameraError, Resolution};
use tracing::{info, warn};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

pub struct DirectoryCamera {
    dir: PathBuf,
    frames: Vec<Vec<u8>>,
    next: usize,
    resolution: Resolution,
}

impl DirectoryCamera {
    pub fn begin(dir: impl AsRef<Path>, config: &CameraConfig) -> Result<Self, CameraError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = fs::read_dir(&dir)
            .map_err(|e| CameraError::Init(format!("cannot read {}: {}", dir.display(), e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_jpeg_name(path))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match fs::read(path) {
                Ok(data) if data.starts_with(&JPEG_SOI) => frames.push(data),
                Ok(_) => warn!(path = %path.display(), "skipping file without JPEG header"),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }

        if frames.is_empty() {
            return Err(CameraError::Init(format!(
                "no JPEG files in {}",
                dir.display()
            )));
        }

        info!(dir = %dir.display(), frames = frames.len(), "directory camera ready");
        Ok(Self {
            dir,
            frames,
            next: 0,
            resolution: config.initial_resolution,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl CameraDriver for DirectoryCamera {
    type Frame = Vec<u8>;

    fn change_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        if resolution == self.resolution {
            Ok(())
        } else {
            Err(CameraError::Unsupported("directory replay cannot rescale"))
        }
    }

    fn capture(&mut self) -> Result<Vec<u8>, CameraError> {
        let frame = self
            .frames
            .get(self.next)
            .cloned()
            .ok_or_else(|| CameraError::CaptureFailed("no frames loaded".into()))?;
        self.next = (self.next + 1) % self.frames.len();
        Ok(frame)
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }
}

fn is_jpeg_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn jpeg(tag: u8) -> Vec<u8> {
        vec![0xFF, 0xD8, tag, 0xFF, 0xD9]
    }

    #[test]
    fn test_replays_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), jpeg(2)).unwrap();
        fs::write(dir.path().join("a.JPEG"), jpeg(1)).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

        let mut camera = DirectoryCamera::begin(dir.path(), &CameraConfig::default()).unwrap();

        assert_eq!(camera.len(), 2);
        assert_eq!(camera.capture().unwrap(), jpeg(1));
        assert_eq!(camera.capture().unwrap(), jpeg(2));
        assert_eq!(camera.capture().unwrap(), jpeg(1));
    }

    #[test]
    fn test_empty_directory_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let result = DirectoryCamera::begin(dir.path(), &CameraConfig::default());
        assert!(matches!(result, Err(CameraError::Init(_))));
    }

    #[test]
    fn test_refuses_rescaling() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only.jpg"), jpeg(0)).unwrap();
        let config = CameraConfig {
            initial_resolution: Resolution::Mid,
            ..CameraConfig::default()
        };
        let mut camera = DirectoryCamera::begin(dir.path(), &config).unwrap();

        assert!(camera.change_resolution(Resolution::Mid).is_ok());
        assert!(matches!(
            camera.change_resolution(Resolution::Low),
            Err(CameraError::Unsupported(_))
        ));
        assert_eq!(camera.resolution(), Resolution::Mid);
    }
}
