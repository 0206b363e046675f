//! HTTP handlers on top of `EspHttpServer`.
//!
//! The ESP-IDF server runs handlers on a single task, so an open stream
//! occupies the server until its client goes away.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use camstream_core::{
    index_html, mjpeg, CameraDriver, Device, FirmwareConfig, Resolution, Snapshot, StreamSink,
    SystemClock,
};
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::{EspIOError, Write};
use log::{debug, info};

use crate::config::HTTP_PORT;

/// URI handler slots: index, five snapshot paths, stream, plus headroom.
const MAX_URI_HANDLERS: usize = 12;

/// The stream loop and frame writes run on the httpd task.
const HTTPD_STACK_SIZE: usize = 10240;

/// Stream sink writing straight to the socket, bypassing the HTTP framing.
pub struct RawSink<W> {
    conn: W,
}

impl<W> RawSink<W> {
    pub fn new(conn: W) -> Self {
        Self { conn }
    }
}

impl<W> StreamSink for RawSink<W>
where
    W: Write,
    W::Error: fmt::Display,
{
    type Error = W::Error;

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.conn.write_all(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.conn.flush()
    }
}

/// Start the server and register every route the variant serves.
///
/// The returned server must be kept alive.
pub fn start_server<C>(
    device: Arc<Device<C>>,
    config: &FirmwareConfig,
) -> Result<EspHttpServer<'static>>
where
    C: CameraDriver + Send + 'static,
{
    let mut server = EspHttpServer::new(&Configuration {
        http_port: HTTP_PORT,
        max_uri_handlers: MAX_URI_HANDLERS,
        stack_size: HTTPD_STACK_SIZE,
        ..Default::default()
    })?;

    let variant = config.variant;
    server.fn_handler("/", Method::Get, move |req| -> Result<(), EspIOError> {
        req.into_response(200, Some("OK"), &[("Content-Type", "text/html")])?
            .write_all(index_html(variant).as_bytes())
    })?;

    for &(path, resolution) in Resolution::snapshot_paths() {
        let device = device.clone();
        server.fn_handler(path, Method::Get, move |req| -> Result<(), EspIOError> {
            match device.snapshot(resolution) {
                Snapshot::Jpeg(frame) => {
                    let body: &[u8] = frame.as_ref();
                    let len = body.len().to_string();
                    debug!("Serving {} snapshot ({} bytes)", resolution, body.len());
                    req.into_response(
                        200,
                        Some("OK"),
                        &[("Content-Type", "image/jpeg"), ("Content-Length", &len)],
                    )?
                    .write_all(body)
                }
                Snapshot::Unavailable => {
                    req.into_status_response(503)?;
                    Ok(())
                }
            }
        })?;
    }

    if variant.serves_stream() {
        let stream_config = config.stream.clone();
        server.fn_handler("/stream", Method::Get, move |mut req| -> Result<()> {
            let conn = req.connection().raw_connection()?;
            let mut sink = RawSink::new(conn);
            if let Err(e) = sink.write_all(mjpeg::STREAM_RESPONSE_HEAD.as_bytes()) {
                debug!("Stream client gone before head: {}", e);
                return Ok(());
            }
            device.stream(&mut sink, &SystemClock, &stream_config);
            Ok(())
        })?;
    }

    info!("HTTP server started on port {}", HTTP_PORT);
    Ok(server)
}
