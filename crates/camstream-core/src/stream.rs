//! Blocking MJPEG streaming loop.
//!
//! One call serves one client for as long as it stays connected. The loop
//! captures a frame once per interval, writes it as a multipart part and
//! releases the frame before pacing for the next one. It ends when the
//! client goes away or the camera fails a capture; neither case is an error
//! for the caller, only a [`StreamEnd`] reason.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::camera::CameraDriver;
use crate::config::StreamConfig;
use crate::mjpeg::write_part;
use crate::pacing::{Clock, FramePacer, Pace};

/// Raw byte sink for a streaming response.
///
/// Implementations write straight to the client connection, bypassing any
/// buffered response path of the HTTP framework.
pub trait StreamSink {
    type Error: fmt::Display;

    /// Write the whole buffer or fail.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Push buffered bytes to the transport.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Whether the client is still there. Sinks that only learn about a
    /// disconnect from a failed write keep the default.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Why a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The client closed the connection or a write failed.
    ClientDisconnected,
    /// The camera returned no frame.
    CaptureFailed,
}

/// Summary of one finished stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    /// Parts fully written.
    pub frames: u64,
    /// Bytes written, headers included.
    pub bytes: u64,
    /// Time from the first pacing check to the end.
    pub elapsed: Duration,
    pub end: StreamEnd,
}

/// Serve frames from `camera` to `sink` until the client leaves or a
/// capture fails.
///
/// The caller selects the resolution beforehand and must hold exclusive
/// access to the camera for the whole call.
pub fn run_stream<C, S, K>(
    camera: &mut C,
    sink: &mut S,
    clock: &K,
    config: &StreamConfig,
) -> StreamReport
where
    C: CameraDriver + ?Sized,
    S: StreamSink + ?Sized,
    K: Clock + ?Sized,
{
    let started = clock.now();
    let poll_interval = config.poll_interval();
    let mut pacer = FramePacer::new(config.frame_interval());
    let mut frames = 0u64;
    let mut bytes = 0u64;

    let end = loop {
        if !sink.is_connected() {
            break StreamEnd::ClientDisconnected;
        }

        let now = clock.now();
        if let Pace::Wait(remaining) = pacer.poll(now) {
            clock.sleep(remaining.min(poll_interval));
            continue;
        }

        let frame = match camera.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, frames, "capture failed, ending stream");
                break StreamEnd::CaptureFailed;
            }
        };
        // The interval runs between part starts, so capture time is excluded.
        pacer.mark(clock.now());

        // `frame` drops at the end of this block on every path.
        match write_part(sink, frame.as_ref(), config.chunk_size) {
            Ok(written) => {
                frames += 1;
                bytes += written as u64;
            }
            Err(e) => {
                debug!(error = %e, frames, "stream write failed");
                break StreamEnd::ClientDisconnected;
            }
        }
    };

    StreamReport {
        frames,
        bytes,
        elapsed: clock.now().saturating_duration_since(started),
        end,
    }
}
