//! # camstream-camera
//!
//! Camera backends for running the firmware on a host machine.
//!
//! - [`SyntheticCamera`] renders a moving test pattern and can inject
//!   capture and resolution-change failures
//! - [`DirectoryCamera`] replays JPEG files from a directory
//!
//! Both implement [`camstream_core::CameraDriver`] with owned `Vec<u8>`
//! frames, so releasing a frame is simply dropping it.

pub mod directory;
pub mod synthetic;

pub use directory::DirectoryCamera;
pub use synthetic::{SyntheticCamera, SyntheticConfig};

use camstream_core::{CameraDriver, CameraError, Resolution};

/// Camera backend selected at runtime.
pub enum HostCamera {
    Synthetic(SyntheticCamera),
    Directory(DirectoryCamera),
}

impl CameraDriver for HostCamera {
    type Frame = Vec<u8>;

    fn change_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        match self {
            HostCamera::Synthetic(camera) => camera.change_resolution(resolution),
            HostCamera::Directory(camera) => camera.change_resolution(resolution),
        }
    }

    fn capture(&mut self) -> Result<Vec<u8>, CameraError> {
        match self {
            HostCamera::Synthetic(camera) => camera.capture(),
            HostCamera::Directory(camera) => camera.capture(),
        }
    }

    fn resolution(&self) -> Resolution {
        match self {
            HostCamera::Synthetic(camera) => camera.resolution(),
            HostCamera::Directory(camera) => camera.resolution(),
        }
    }
}

impl From<SyntheticCamera> for HostCamera {
    fn from(camera: SyntheticCamera) -> Self {
        HostCamera::Synthetic(camera)
    }
}

impl From<DirectoryCamera> for HostCamera {
    fn from(camera: DirectoryCamera) -> Self {
        HostCamera::Directory(camera)
    }
}
