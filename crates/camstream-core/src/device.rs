//! Device state shared by all request handlers.
//!
//! The camera is the only stateful resource on the device. `Device` owns it
//! behind a single mutex so that no two requests ever capture concurrently:
//! a snapshot requested while a stream is running waits until that stream
//! ends.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::camera::CameraDriver;
use crate::config::StreamConfig;
use crate::pacing::Clock;
use crate::resolution::Resolution;
use crate::snapshot::Snapshot;
use crate::stream::{run_stream, StreamReport, StreamSink};

/// Owner of the camera driver.
#[derive(Debug)]
pub struct Device<C> {
    camera: Mutex<C>,
}

impl<C: CameraDriver> Device<C> {
    pub fn new(camera: C) -> Self {
        Self {
            camera: Mutex::new(camera),
        }
    }

    /// Capture one frame at `resolution`.
    ///
    /// A failed resolution change is logged and the capture proceeds at
    /// whatever resolution is active. A failed capture yields
    /// [`Snapshot::Unavailable`]; there is no retry.
    pub fn snapshot(&self, resolution: Resolution) -> Snapshot<C::Frame> {
        let mut camera = self.lock();
        prepare(&mut *camera, resolution);

        match camera.capture() {
            Ok(frame) => {
                debug!(%resolution, bytes = frame.as_ref().len(), "snapshot captured");
                Snapshot::Jpeg(frame)
            }
            Err(e) => {
                warn!(%resolution, error = %e, "snapshot capture failed");
                Snapshot::Unavailable
            }
        }
    }

    /// Serve an MJPEG stream at [`Resolution::STREAM`] until the client
    /// disconnects or a capture fails.
    ///
    /// The camera stays locked for the whole stream.
    pub fn stream<S, K>(&self, sink: &mut S, clock: &K, config: &StreamConfig) -> StreamReport
    where
        S: StreamSink + ?Sized,
        K: Clock + ?Sized,
    {
        let mut camera = self.lock();
        prepare(&mut *camera, Resolution::STREAM);

        info!(resolution = %camera.resolution(), fps = config.fps, "stream started");
        let report = run_stream(&mut *camera, sink, clock, config);
        info!(
            frames = report.frames,
            bytes = report.bytes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            end = ?report.end,
            "stream ended"
        );
        report
    }

    /// Resolution the camera is currently configured for.
    pub fn resolution(&self) -> Resolution {
        self.lock().resolution()
    }

    /// Exclusive access to the camera.
    ///
    /// A handler that panicked while holding the lock leaves the driver in a
    /// usable state, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, C> {
        self.camera
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn into_inner(self) -> C {
        self.camera
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Apply `resolution`, keeping the previous one if the driver refuses.
fn prepare<C: CameraDriver + ?Sized>(camera: &mut C, resolution: Resolution) {
    if let Err(e) = camera.change_resolution(resolution) {
        warn!(
            requested = %resolution,
            active = %camera.resolution(),
            error = %e,
            "resolution change failed, serving at active resolution"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraError;
    use crate::pacing::SystemClock;
    use crate::stream::StreamEnd;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct ScriptedCamera {
        resolution: Resolution,
        reject_changes: bool,
        frames_left: usize,
    }

    impl ScriptedCamera {
        fn new(frames_left: usize) -> Self {
            Self {
                resolution: Resolution::High,
                reject_changes: false,
                frames_left,
            }
        }
    }

    impl CameraDriver for ScriptedCamera {
        type Frame = Vec<u8>;

        fn change_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
            if self.reject_changes {
                return Err(CameraError::ResolutionChange {
                    resolution,
                    reason: "sensor busy".into(),
                });
            }
            self.resolution = resolution;
            Ok(())
        }

        fn capture(&mut self) -> Result<Vec<u8>, CameraError> {
            if self.frames_left == 0 {
                return Err(CameraError::Timeout);
            }
            self.frames_left -= 1;
            let mut data = vec![0xFF, 0xD8];
            data.extend_from_slice(&self.resolution.width().to_be_bytes());
            data.extend_from_slice(&[0xFF, 0xD9]);
            Ok(data)
        }

        fn resolution(&self) -> Resolution {
            self.resolution
        }
    }

    struct NullSink;

    impl StreamSink for NullSink {
        type Error = std::convert::Infallible;

        fn write_all(&mut self, _buf: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_applies_resolution() {
        let device = Device::new(ScriptedCamera::new(1));

        let snapshot = device.snapshot(Resolution::Mid);

        assert_eq!(snapshot.status(), 200);
        assert!(snapshot.body().starts_with(&[0xFF, 0xD8]));
        assert_eq!(device.resolution(), Resolution::Mid);
    }

    #[test]
    fn test_snapshot_failure_is_unavailable() {
        let device = Device::new(ScriptedCamera::new(0));

        let snapshot = device.snapshot(Resolution::Low);

        assert!(matches!(snapshot, Snapshot::Unavailable));
        assert_eq!(snapshot.status(), 503);
    }

    #[test]
    fn test_rejected_resolution_change_still_serves() {
        let mut camera = ScriptedCamera::new(1);
        camera.reject_changes = true;
        let device = Device::new(camera);

        let snapshot = device.snapshot(Resolution::Low);

        assert_eq!(snapshot.status(), 200);
        assert_eq!(device.resolution(), Resolution::High);
        assert_eq!(&snapshot.body()[2..6], &800u32.to_be_bytes());
    }

    #[test]
    fn test_stream_runs_at_low_resolution() {
        let device = Device::new(ScriptedCamera::new(2));
        let config = StreamConfig {
            fps: 60,
            ..StreamConfig::default()
        };

        let report = device.stream(&mut NullSink, &SystemClock, &config);

        assert_eq!(report.frames, 2);
        assert_eq!(report.end, StreamEnd::CaptureFailed);
        assert_eq!(device.resolution(), Resolution::Low);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let device = Arc::new(Device::new(ScriptedCamera::new(1)));

        let poisoner = device.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("handler panicked");
        })
        .join();

        assert_eq!(device.snapshot(Resolution::Low).status(), 200);
    }
}
