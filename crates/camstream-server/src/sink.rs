//! Raw streaming response backed by a channel.
//!
//! axum does not hand out the client socket, so the blocking stream loop
//! writes into a bounded channel whose receiver is the response body. When
//! the client goes away hyper drops the body, the channel closes and the
//! sink reports the disconnect.

use axum::body::{Body, Bytes};
use camstream_core::StreamSink;
use std::convert::Infallible;
use thiserror::Error;
use tokio::sync::mpsc;

/// Chunks buffered between the stream loop and the socket.
pub const CHANNEL_DEPTH: usize = 8;

/// The response body was dropped.
#[derive(Debug, Error)]
#[error("client disconnected")]
pub struct SinkClosed;

/// Blocking sink feeding a streaming response body.
///
/// Must be used from a blocking thread (`spawn_blocking`), never from
/// inside the async runtime.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// Create a sink and the response body it feeds.
    pub fn pair() -> (Self, Body) {
        let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_DEPTH);
        let chunks = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|chunk| (Ok::<_, Infallible>(chunk), rx))
        });
        (Self { tx }, Body::from_stream(chunks))
    }
}

impl StreamSink for ChannelSink {
    type Error = SinkClosed;

    fn write_all(&mut self, buf: &[u8]) -> Result<(), SinkClosed> {
        self.tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| SinkClosed)
    }

    fn flush(&mut self) -> Result<(), SinkClosed> {
        // Every write is already its own body frame.
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_writes_reach_body_in_order() {
        let (mut sink, body) = ChannelSink::pair();

        let writer = tokio::task::spawn_blocking(move || {
            sink.write_all(b"head").unwrap();
            sink.write_all(b"body").unwrap();
        });

        let mut data = body.into_data_stream();
        assert_eq!(data.next().await.unwrap().unwrap(), Bytes::from_static(b"head"));
        assert_eq!(data.next().await.unwrap().unwrap(), Bytes::from_static(b"body"));
        writer.await.unwrap();
        assert!(data.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_body_disconnects_sink() {
        let (mut sink, body) = ChannelSink::pair();
        drop(body);

        let result = tokio::task::spawn_blocking(move || {
            let connected = sink.is_connected();
            (connected, sink.write_all(b"late").is_err())
        })
        .await
        .unwrap();

        assert_eq!(result, (false, true));
    }
}
