//! Recorded cursor samples.
//!
//! Samples are produced by the recorder and arrive as a JSON array. They are
//! expected to be time-ordered, but a stray out-of-order entry must never
//! crash the engine, so `normalize_samples` re-sorts defensively once per
//! job instead of trusting the producer.

use serde::{Deserialize, Serialize};

/// What a cursor sample represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Pointer position update.
    Move,
    /// Mouse button press at this position.
    Click,
}

/// A single recorded cursor sample.
///
/// Coordinates are in source-video pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorSample {
    /// Milliseconds since recording start.
    #[serde(rename = "timestampMs")]
    pub time_ms: f64,

    /// X position in source pixels.
    pub x: f64,

    /// Y position in source pixels.
    pub y: f64,

    /// Move or click.
    pub kind: SampleKind,
}

impl CursorSample {
    pub fn moved(time_ms: f64, x: f64, y: f64) -> Self {
        Self {
            time_ms,
            x,
            y,
            kind: SampleKind::Move,
        }
    }

    pub fn clicked(time_ms: f64, x: f64, y: f64) -> Self {
        Self {
            time_ms,
            x,
            y,
            kind: SampleKind::Click,
        }
    }

    pub fn is_click(&self) -> bool {
        self.kind == SampleKind::Click
    }
}

/// Parse a JSON array of cursor samples.
pub fn parse_cursor_samples(json: &str) -> Result<Vec<CursorSample>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Sort samples by timestamp if the producer emitted them out of order.
///
/// Returns true if a re-sort was needed.
pub fn normalize_samples(samples: &mut [CursorSample]) -> bool {
    let ordered = samples.windows(2).all(|w| w[0].time_ms <= w[1].time_ms);
    if !ordered {
        samples.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
    }
    !ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_samples() {
        let json = r#"[
            {"timestampMs": 0, "x": 100, "y": 100, "kind": "move"},
            {"timestampMs": 1000, "x": 300, "y": 200, "kind": "click"}
        ]"#;

        let samples = parse_cursor_samples(json).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].kind, SampleKind::Move);
        assert!(samples[1].is_click());
        assert_eq!(samples[1].x, 300.0);
    }

    #[test]
    fn test_normalize_reorders() {
        let mut samples = vec![
            CursorSample::moved(100.0, 1.0, 1.0),
            CursorSample::moved(0.0, 0.0, 0.0),
            CursorSample::moved(50.0, 0.5, 0.5),
        ];

        assert!(normalize_samples(&mut samples));
        assert_eq!(samples[0].time_ms, 0.0);
        assert_eq!(samples[2].time_ms, 100.0);
        assert!(!normalize_samples(&mut samples));
    }

    #[test]
    fn test_normalize_empty_is_noop() {
        let mut samples: Vec<CursorSample> = vec![];
        assert!(!normalize_samples(&mut samples));
    }
}
