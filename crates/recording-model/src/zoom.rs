//! Zoom-in windows.

use serde::{Deserialize, Serialize};

/// A designated camera-zoom interval.
///
/// `x`/`y` are the normalized focus point in `[0, 1]`; `scale` is the target
/// magnification (`> 1.0` means zoomed in). Windows are assumed disjoint and
/// lookups take the first match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomWindow {
    /// Window start, seconds since recording start.
    pub start_sec: f64,

    /// Normalized focus X (fraction of frame width).
    pub x: f64,

    /// Normalized focus Y (fraction of frame height).
    pub y: f64,

    /// Target magnification at full zoom.
    pub scale: f64,

    /// Window length in seconds.
    pub duration_sec: f64,
}

impl ZoomWindow {
    /// End of the window, seconds since recording start.
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }

    /// Whether `time_sec` falls inside `[start, start + duration]`.
    pub fn contains(&self, time_sec: f64) -> bool {
        time_sec >= self.start_sec && time_sec <= self.end_sec()
    }
}

/// Parse a JSON array of zoom windows.
pub fn parse_zoom_windows(json: &str) -> Result<Vec<ZoomWindow>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_windows() {
        let json = r#"[{"startSec": 2.0, "x": 0.3, "y": 0.6, "scale": 1.8, "durationSec": 4.0}]"#;

        let windows = parse_zoom_windows(json).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].end_sec(), 6.0);
        assert!(windows[0].contains(2.0));
        assert!(windows[0].contains(6.0));
        assert!(!windows[0].contains(6.001));
    }
}
