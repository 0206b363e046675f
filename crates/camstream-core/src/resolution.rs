//! Fixed capture resolution presets.
//!
//! The firmware exposes exactly three capture sizes. Each snapshot URL is
//! bound to one preset; the MJPEG stream always runs at [`Resolution::Low`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three fixed capture dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// 320x240 (QVGA).
    Low,
    /// 640x480 (VGA).
    Mid,
    /// 800x600 (SVGA).
    High,
}

/// Snapshot URL paths and the preset each one serves.
const SNAPSHOT_PATHS: [(&str, Resolution); 5] = [
    ("/cam-lo.jpg", Resolution::Low),
    ("/snap-lo.jpg", Resolution::Low),
    ("/cam-mid.jpg", Resolution::Mid),
    ("/snap.jpg", Resolution::Mid),
    ("/cam-hi.jpg", Resolution::High),
];

impl Resolution {
    /// All presets, smallest first.
    pub const ALL: [Resolution; 3] = [Resolution::Low, Resolution::Mid, Resolution::High];

    /// Preset used by the MJPEG stream.
    pub const STREAM: Resolution = Resolution::Low;

    pub fn width(self) -> u32 {
        match self {
            Resolution::Low => 320,
            Resolution::Mid => 640,
            Resolution::High => 800,
        }
    }

    pub fn height(self) -> u32 {
        match self {
            Resolution::Low => 240,
            Resolution::Mid => 480,
            Resolution::High => 600,
        }
    }

    /// Every snapshot path with the preset it is bound to.
    pub fn snapshot_paths() -> &'static [(&'static str, Resolution)] {
        &SNAPSHOT_PATHS
    }

    /// Look up the preset served at a snapshot path.
    pub fn for_snapshot_path(path: &str) -> Option<Resolution> {
        SNAPSHOT_PATHS
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, r)| *r)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

/// Error returned when a preset name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resolution preset '{0}' (expected lo, mid or hi)")]
pub struct ParseResolutionError(String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lo" | "low" => Ok(Resolution::Low),
            "mid" => Ok(Resolution::Mid),
            "hi" | "high" => Ok(Resolution::High),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}
