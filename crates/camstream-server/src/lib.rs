//! # camstream-server
//!
//! HTTP front end for the camera firmware on Linux.
//!
//! This crate provides:
//! - The axum router with the index page, snapshot and stream routes
//! - A channel-backed raw streaming response for the MJPEG stream
//! - Boot helpers that classify fatal errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use camstream_server::{bind, serve, AppState};
//!
//! let state = AppState::new(camera, &config);
//! let listener = bind("0.0.0.0:8080".parse()?).await?;
//! serve(listener, state).await?;
//! ```

pub mod boot;
pub mod routes;
pub mod sink;

pub use boot::{bind, serve, BootError};
pub use routes::create_router;
pub use sink::{ChannelSink, SinkClosed};

use std::sync::Arc;

use camstream_core::{CameraDriver, Device, FirmwareConfig, FirmwareVariant, StreamConfig};

/// Shared state for all route handlers.
pub struct AppState<C> {
    pub device: Arc<Device<C>>,
    pub stream: StreamConfig,
    pub variant: FirmwareVariant,
}

impl<C: CameraDriver> AppState<C> {
    pub fn new(camera: C, config: &FirmwareConfig) -> Self {
        Self {
            device: Arc::new(Device::new(camera)),
            stream: config.stream.clone(),
            variant: config.variant,
        }
    }
}

// Manual impl: cloning the state never clones the camera.
impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
            stream: self.stream.clone(),
            variant: self.variant,
        }
    }
}
