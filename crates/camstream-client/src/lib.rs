//! # camstream-client
//!
//! Blocking reader for a camstream device, used by host-side tools.
//!
//! This crate provides:
//! - URL normalisation choosing snapshot polling or MJPEG streaming
//! - An MJPEG reader over any `Read`
//! - A reconnecting frame iterator built on `ureq`

pub mod error;
pub mod reader;
pub mod source;

pub use error::ClientError;
pub use reader::{boundary_from_content_type, FrameReader, JpegFrame, MjpegReader, ReconnectPolicy};
pub use source::{Source, DEFAULT_URL, URL_ENV};
