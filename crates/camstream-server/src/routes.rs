//! HTTP route handlers.
//!
//! | Path | Handler |
//! |---|---|
//! | `/` | static index page for the configured variant |
//! | `/cam-lo.jpg`, `/snap-lo.jpg` | snapshot at the low preset |
//! | `/cam-mid.jpg`, `/snap.jpg` | snapshot at the mid preset |
//! | `/cam-hi.jpg` | snapshot at the high preset |
//! | `/stream` | MJPEG stream (stream variant only) |
//!
//! Camera work runs on the blocking pool; the device mutex serialises it.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use camstream_core::{index_html, mjpeg, CameraDriver, Resolution, Snapshot, SystemClock};
use tracing::{debug, error};

use crate::sink::ChannelSink;
use crate::AppState;

/// Create the router with every route the variant serves.
pub fn create_router<C>(state: AppState<C>) -> Router
where
    C: CameraDriver + Send + 'static,
{
    let mut router = Router::new().route("/", get(index_handler::<C>));

    for &(path, resolution) in Resolution::snapshot_paths() {
        router = router.route(
            path,
            get(move |State(state): State<AppState<C>>| snapshot_handler(state, resolution)),
        );
    }

    if state.variant.serves_stream() {
        router = router.route("/stream", get(stream_handler::<C>));
    }

    router.with_state(state)
}

async fn index_handler<C>(State(state): State<AppState<C>>) -> Html<&'static str> {
    Html(index_html(state.variant))
}

/// Capture one frame and answer `200 image/jpeg` or `503`.
async fn snapshot_handler<C>(state: AppState<C>, resolution: Resolution) -> Response
where
    C: CameraDriver + Send + 'static,
{
    let device = state.device.clone();
    // Copy out of the driver buffer so it is released before the network write.
    let snapshot =
        tokio::task::spawn_blocking(move || device.snapshot(resolution).into_owned()).await;

    match snapshot {
        Ok(Snapshot::Jpeg(jpeg)) => {
            debug!(%resolution, bytes = jpeg.len(), "serving snapshot");
            (
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
                    (header::CONTENT_LENGTH, HeaderValue::from(jpeg.len())),
                ],
                jpeg,
            )
                .into_response()
        }
        Ok(Snapshot::Unavailable) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(e) => {
            error!(%resolution, error = %e, "snapshot task failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Start an MJPEG stream.
///
/// The response head goes out immediately; parts follow as the blocking
/// stream loop produces them. A second stream waits for the device lock.
async fn stream_handler<C>(State(state): State<AppState<C>>) -> Response
where
    C: CameraDriver + Send + 'static,
{
    let (mut sink, body) = ChannelSink::pair();
    let device = state.device.clone();
    let config = state.stream.clone();

    tokio::task::spawn_blocking(move || {
        device.stream(&mut sink, &SystemClock, &config);
    });

    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(mjpeg::STREAM_CONTENT_TYPE),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
        ],
        body,
    )
        .into_response()
}
