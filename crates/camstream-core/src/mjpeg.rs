//! MJPEG multipart framing.
//!
//! An MJPEG stream is one long `multipart/x-mixed-replace` response. Every
//! part carries a single JPEG:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: N\r\n
//! \r\n
//! <N bytes>\r\n
//! ```
//!
//! The encoder half writes parts to a [`StreamSink`]. The decoder half is
//! used by host-side readers and tests to split a received byte stream back
//! into JPEG bodies.

use thiserror::Error;

use crate::stream::StreamSink;

/// Multipart boundary token.
pub const BOUNDARY: &str = "frame";

/// Content type of the stream response.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace;boundary=frame";

/// Complete response head for platforms that write straight to the socket.
pub const STREAM_RESPONSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
Content-Type: multipart/x-mixed-replace;boundary=frame\r\n\
Access-Control-Allow-Origin: *\r\n\
\r\n";

/// Bytes that close every part body.
pub const PART_TRAILER: &[u8] = b"\r\n";

/// Largest part the decoder accepts by default.
pub const DEFAULT_MAX_PART_LEN: usize = 5 * 1024 * 1024;

/// Longest header block searched before the boundary is abandoned.
const MAX_HEADER_LEN: usize = 1024;

/// Header block that precedes a body of `len` bytes.
pub fn part_header(len: usize) -> String {
    format!("--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {len}\r\n\r\n")
}

/// Write one part: header, flush, body in chunks of at most `chunk_size`,
/// then the trailer.
///
/// The header is flushed on its own so a receiver learns the body length
/// before any body bytes arrive. Returns the number of bytes written.
pub fn write_part<S: StreamSink + ?Sized>(
    sink: &mut S,
    body: &[u8],
    chunk_size: usize,
) -> Result<usize, S::Error> {
    let header = part_header(body.len());
    sink.write_all(header.as_bytes())?;
    sink.flush()?;

    for chunk in body.chunks(chunk_size.max(1)) {
        sink.write_all(chunk)?;
    }
    sink.write_all(PART_TRAILER)?;
    sink.flush()?;

    Ok(header.len() + body.len() + PART_TRAILER.len())
}

/// Errors produced while decoding a multipart stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A part declared a body larger than the decoder accepts.
    #[error("part of {len} bytes exceeds limit of {max} bytes")]
    PartTooLarge { len: usize, max: usize },
}

/// Incremental multipart decoder.
///
/// Feed received bytes with [`push`](Self::push) and drain complete bodies
/// with [`next_part`](Self::next_part). Parts without a positive
/// `Content-Length` are skipped.
#[derive(Debug)]
pub struct PartDecoder {
    delimiter: Vec<u8>,
    buf: Vec<u8>,
    pending: Option<usize>,
    max_part_len: usize,
}

impl PartDecoder {
    /// Create a decoder for the given boundary token (without leading `--`).
    pub fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            buf: Vec::with_capacity(64 * 1024),
            pending: None,
            max_part_len: DEFAULT_MAX_PART_LEN,
        }
    }

    pub fn with_max_part_len(mut self, max_part_len: usize) -> Self {
        self.max_part_len = max_part_len;
        self
    }

    /// Append received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes held but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete body, or `None` if more bytes are needed.
    pub fn next_part(&mut self) -> Result<Option<Vec<u8>>, DecodeError> {
        loop {
            if let Some(len) = self.pending {
                if self.buf.len() < len {
                    return Ok(None);
                }
                let body: Vec<u8> = self.buf.drain(..len).collect();
                self.pending = None;
                self.strip_line_end();
                return Ok(Some(body));
            }

            let Some(start) = find(&self.buf, &self.delimiter) else {
                // Keep just enough to match a delimiter split across pushes.
                let keep = self.delimiter.len() + 4;
                if self.buf.len() > keep {
                    let excess = self.buf.len() - keep;
                    self.buf.drain(..excess);
                }
                return Ok(None);
            };

            let headers_from = start + self.delimiter.len();
            let Some((headers_end, body_from)) = find_header_end(&self.buf[headers_from..]) else {
                if self.buf.len() - headers_from > MAX_HEADER_LEN {
                    self.buf.drain(..headers_from);
                    continue;
                }
                return Ok(None);
            };

            let content_length =
                parse_content_length(&self.buf[headers_from..headers_from + headers_end]);
            self.buf.drain(..headers_from + body_from);

            match content_length {
                Some(len) if len > self.max_part_len => {
                    return Err(DecodeError::PartTooLarge {
                        len,
                        max: self.max_part_len,
                    });
                }
                Some(len) if len > 0 => self.pending = Some(len),
                _ => {}
            }
        }
    }

    fn strip_line_end(&mut self) {
        if self.buf.starts_with(b"\r\n") {
            self.buf.drain(..2);
        } else if self.buf.starts_with(b"\n") {
            self.buf.drain(..1);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Locate the blank line closing a header block.
///
/// Returns `(end of headers, start of body)` relative to `block`.
fn find_header_end(block: &[u8]) -> Option<(usize, usize)> {
    let crlf = find(block, b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = find(block, b"\n\n").map(|i| (i, i + 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_content_length(headers: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(headers);
    text.lines().find_map(|line| {
        let (name, value) = line.trim().split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
