//! Boot sequence helpers.
//!
//! Camera init and network setup are the two fatal failures. The binary
//! reacts to either by waiting the restart delay and booting again.

use std::net::SocketAddr;

use camstream_core::{CameraDriver, CameraError};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes::create_router;
use crate::AppState;

/// Fatal errors that restart the device.
#[derive(Debug, Error)]
pub enum BootError {
    /// The camera could not be initialised.
    #[error("camera unavailable: {0}")]
    Camera(#[from] CameraError),

    /// The HTTP listener could not be opened.
    #[error("network unavailable on {addr}: {source}")]
    Network {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Open the HTTP listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, BootError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BootError::Network { addr, source })?;
    let local = listener
        .local_addr()
        .map_err(|source| BootError::Network { addr, source })?;
    info!("HTTP server listening on {}", local);
    Ok(listener)
}

/// Serve requests until the listener fails.
pub async fn serve<C>(listener: TcpListener, state: AppState<C>) -> std::io::Result<()>
where
    C: CameraDriver + Send + 'static,
{
    let app = create_router(state).layer(TraceLayer::new_for_http());
    axum::serve(listener, app).await
}
