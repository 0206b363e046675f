//! Device URL normalisation.
//!
//! A bare device address is turned into a stream URL; anything that names a
//! `.jpg` endpoint is polled one snapshot per request instead.

use url::Url;

use crate::error::ClientError;

/// URL used when none is given.
pub const DEFAULT_URL: &str = "http://192.168.1.100/cam-lo.jpg";

/// Environment variable overriding [`DEFAULT_URL`].
pub const URL_ENV: &str = "STREAM_URL";

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// One GET per frame against a JPEG endpoint.
    Snapshot(Url),
    /// One long-lived multipart response.
    Stream(Url),
}

impl Source {
    /// Normalise a user-supplied URL.
    ///
    /// - `.jpg` endpoints (or `snap` / `cam-` paths containing `.jpg`) are polled
    /// - URLs ending in `/stream` are streamed as-is
    /// - anything else gets `/stream` appended
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let raw = raw.trim();
        let raw = if raw.is_empty() { DEFAULT_URL } else { raw };

        let (normalized, poll) = if is_snapshot_url(raw) {
            (raw.trim_end_matches('/').to_string(), true)
        } else if raw.ends_with("/stream") || raw.ends_with("/stream/") {
            (raw.trim_end_matches('/').to_string(), false)
        } else {
            (format!("{}/stream", raw.trim_end_matches('/')), false)
        };

        let url = Url::parse(&normalized).map_err(|source| ClientError::InvalidUrl {
            url: normalized.clone(),
            source,
        })?;
        Ok(if poll {
            Source::Snapshot(url)
        } else {
            Source::Stream(url)
        })
    }

    /// Source from `STREAM_URL`, falling back to [`DEFAULT_URL`].
    pub fn from_env() -> Result<Self, ClientError> {
        let raw = std::env::var(URL_ENV).unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::parse(&raw)
    }

    pub fn url(&self) -> &Url {
        match self {
            Source::Snapshot(url) | Source::Stream(url) => url,
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self, Source::Snapshot(_))
    }
}

fn is_snapshot_url(raw: &str) -> bool {
    let trimmed = raw.trim_end_matches('/');
    ((raw.contains("snap") || raw.contains("cam-")) && raw.contains(".jpg"))
        || trimmed.ends_with(".jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_snapshot_urls_are_polled() {
        assert_eq!(
            Source::parse("http://10.0.0.5/cam-hi.jpg/").unwrap(),
            Source::Snapshot(url("http://10.0.0.5/cam-hi.jpg"))
        );
        assert_eq!(
            Source::parse("http://10.0.0.5/snap.jpg?t=1").unwrap(),
            Source::Snapshot(url("http://10.0.0.5/snap.jpg?t=1"))
        );
        assert_eq!(
            Source::parse("http://10.0.0.5/frame.jpg").unwrap(),
            Source::Snapshot(url("http://10.0.0.5/frame.jpg"))
        );
    }

    #[test]
    fn test_stream_urls() {
        assert_eq!(
            Source::parse("http://10.0.0.5/stream/").unwrap(),
            Source::Stream(url("http://10.0.0.5/stream"))
        );
        assert_eq!(
            Source::parse("http://10.0.0.5").unwrap(),
            Source::Stream(url("http://10.0.0.5/stream"))
        );
        assert_eq!(
            Source::parse("http://10.0.0.5/").unwrap(),
            Source::Stream(url("http://10.0.0.5/stream"))
        );
    }

    #[test]
    fn test_empty_uses_default() {
        let source = Source::parse("  ").unwrap();
        assert!(source.is_polling());
        assert_eq!(source.url().as_str(), DEFAULT_URL);
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            Source::parse("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }
}
