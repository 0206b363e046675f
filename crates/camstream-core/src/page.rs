//! Static index page served at `/`.

use serde::{Deserialize, Serialize};

/// Which flavour of the firmware is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareVariant {
    /// Index page polls `/cam-lo.jpg`; no `/stream` route.
    Snapshot,
    /// Index page embeds `/stream`.
    Stream,
}

impl FirmwareVariant {
    /// Whether the `/stream` route is registered.
    pub fn serves_stream(self) -> bool {
        matches!(self, FirmwareVariant::Stream)
    }
}

const SNAPSHOT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>ESP32-CAM</title></head>
<body>
<h1>ESP32-CAM</h1>
<p><a href="/cam-lo.jpg">low</a> | <a href="/cam-mid.jpg">mid</a> | <a href="/cam-hi.jpg">high</a></p>
<img id="cam" src="/cam-lo.jpg">
<script>
setInterval(function () {
  document.getElementById("cam").src = "/cam-lo.jpg?t=" + Date.now();
}, 200);
</script>
</body>
</html>
"#;

const STREAM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>ESP32-CAM</title></head>
<body>
<h1>ESP32-CAM</h1>
<p><a href="/cam-lo.jpg">low</a> | <a href="/cam-mid.jpg">mid</a> | <a href="/cam-hi.jpg">high</a></p>
<img src="/stream">
</body>
</html>
"#;

/// HTML for the index page of the given variant.
pub fn index_html(variant: FirmwareVariant) -> &'static str {
    match variant {
        FirmwareVariant::Snapshot => SNAPSHOT_PAGE,
        FirmwareVariant::Stream => STREAM_PAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_embed_the_right_source() {
        assert!(index_html(FirmwareVariant::Stream).contains(r#"<img src="/stream">"#));
        let polling = index_html(FirmwareVariant::Snapshot);
        assert!(polling.contains("/cam-lo.jpg?t="));
        assert!(!polling.contains("/stream"));
    }
}
