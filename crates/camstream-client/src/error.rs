//! Client error type.

use camstream_core::mjpeg::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The device URL could not be parsed.
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP request failed or returned an error status.
    #[error("request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The device closed the stream.
    #[error("stream ended")]
    StreamEnded,

    #[error("malformed stream: {0}")]
    Decode(#[from] DecodeError),

    /// A snapshot body exceeded the size limit.
    #[error("snapshot exceeds {0} bytes")]
    TooLarge(usize),
}

impl From<ureq::Error> for ClientError {
    fn from(e: ureq::Error) -> Self {
        ClientError::Http(Box::new(e))
    }
}
