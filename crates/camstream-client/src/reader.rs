//! Frame readers.
//!
//! [`MjpegReader`] splits any byte stream into JPEG frames. [`FrameReader`]
//! talks HTTP to the device, choosing between snapshot polling and the
//! MJPEG stream, and reconnects after errors.

use std::io::Read;
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use camstream_core::mjpeg::{PartDecoder, BOUNDARY, DEFAULT_MAX_PART_LEN};
use regex::Regex;
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::error::ClientError;
use crate::source::Source;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const READ_SIZE: usize = 4096;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// One received JPEG.
#[derive(Debug, Clone)]
pub struct JpegFrame {
    pub data: Vec<u8>,
    pub received_at: Instant,
}

impl JpegFrame {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            received_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Extract the multipart boundary from a `Content-Type` header.
///
/// Falls back to `frame` when the header names none.
pub fn boundary_from_content_type(content_type: &str) -> String {
    static BOUNDARY_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = BOUNDARY_RE
        .get_or_init(|| Regex::new(r#"boundary=(?:"([^"]+)"|([^;\s]+))"#).ok())
        .as_ref()
    else {
        return BOUNDARY.to_string();
    };

    re.captures(content_type)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| BOUNDARY.to_string())
}

/// Splits a multipart byte stream into JPEG frames.
pub struct MjpegReader<R> {
    reader: R,
    decoder: PartDecoder,
    chunk: Vec<u8>,
}

impl<R: Read> MjpegReader<R> {
    pub fn new(reader: R, boundary: &str) -> Self {
        Self {
            reader,
            decoder: PartDecoder::new(boundary),
            chunk: vec![0; READ_SIZE],
        }
    }

    /// Block until the next JPEG part arrives.
    ///
    /// Parts that do not start with a JPEG marker are skipped.
    pub fn next_frame(&mut self) -> Result<JpegFrame, ClientError> {
        loop {
            while let Some(part) = self.decoder.next_part()? {
                if part.starts_with(&JPEG_SOI) {
                    return Ok(JpegFrame::new(part));
                }
                debug!(bytes = part.len(), "skipping non-JPEG part");
            }

            let read = self.reader.read(&mut self.chunk)?;
            if read == 0 {
                return Err(ClientError::StreamEnded);
            }
            self.decoder.push(&self.chunk[..read]);
        }
    }
}

/// What to do after a failed read.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub delay: Duration,
    /// Give up after this many consecutive failures.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

type BoxedRead = Box<dyn Read + Send + Sync + 'static>;

/// Reconnecting iterator over frames from a device.
///
/// With reconnect enabled, errors are logged and the source is reopened
/// after the policy delay; with it disabled, the first error is yielded and
/// iteration ends.
pub struct FrameReader {
    agent: Agent,
    source: Source,
    policy: ReconnectPolicy,
    stream: Option<MjpegReader<BoxedRead>>,
    attempt: u32,
    deadline: Option<Instant>,
    finished: bool,
}

impl FrameReader {
    pub fn new(source: Source, policy: ReconnectPolicy) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .user_agent(concat!("camstream-client/", env!("CARGO_PKG_VERSION")))
            .build();

        if source.is_polling() {
            info!(url = %source.url(), "using snapshot polling");
        }

        Self {
            agent,
            source,
            policy,
            stream: None,
            attempt: 0,
            deadline: None,
            finished: false,
        }
    }

    /// Stop iterating at `deadline`, including while waiting to reconnect.
    pub fn until(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn past_deadline(&self, at: Instant) -> bool {
        self.deadline.is_some_and(|deadline| at >= deadline)
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    fn try_next(&mut self) -> Result<JpegFrame, ClientError> {
        match self.source.clone() {
            Source::Snapshot(url) => self.fetch_snapshot(url.as_str()),
            Source::Stream(url) => {
                if self.stream.is_none() {
                    self.stream = Some(self.open_stream(url.as_str())?);
                }
                match self.stream.as_mut() {
                    Some(stream) => stream.next_frame(),
                    None => Err(ClientError::StreamEnded),
                }
            }
        }
    }

    fn request(&self, url: &str) -> Result<ureq::Response, ClientError> {
        Ok(self
            .agent
            .get(url)
            .set("Accept", "image/*")
            .set("Accept-Encoding", "identity")
            .call()?)
    }

    fn fetch_snapshot(&self, url: &str) -> Result<JpegFrame, ClientError> {
        let response = self.request(url)?;
        let limit = DEFAULT_MAX_PART_LEN;
        let mut data = Vec::new();
        response
            .into_reader()
            .take(limit as u64 + 1)
            .read_to_end(&mut data)?;
        if data.len() > limit {
            return Err(ClientError::TooLarge(limit));
        }
        Ok(JpegFrame::new(data))
    }

    fn open_stream(&self, url: &str) -> Result<MjpegReader<BoxedRead>, ClientError> {
        info!(%url, "connecting to stream");
        let response = self.request(url)?;
        let boundary = boundary_from_content_type(response.header("Content-Type").unwrap_or(""));
        debug!(%boundary, "stream connected");
        Ok(MjpegReader::new(response.into_reader(), &boundary))
    }
}

impl Iterator for FrameReader {
    type Item = Result<JpegFrame, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished || self.past_deadline(Instant::now()) {
                return None;
            }

            let err = match self.try_next() {
                Ok(frame) => {
                    self.attempt = 0;
                    return Some(Ok(frame));
                }
                Err(e) => e,
            };
            self.stream = None;

            if !self.policy.enabled {
                self.finished = true;
                return Some(Err(err));
            }

            self.attempt += 1;
            if self.attempt <= 2 {
                warn!(
                    error = %err,
                    "read failed; check the device is on and no other client holds the stream"
                );
            }
            if let Some(max) = self.policy.max_attempts {
                if self.attempt >= max {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
            if self.past_deadline(Instant::now() + self.policy.delay) {
                self.finished = true;
                return Some(Err(err));
            }
            info!(attempt = self.attempt, "waiting for stream");
            thread::sleep(self.policy.delay);
        }
    }
}
