//! Cursor interpolation over sparse recorded samples.
//!
//! Samples arrive at whatever rate the recorder managed; output frames need
//! a position at every frame timestamp. Positions are linearly interpolated
//! between the bracketing pair and clamped to the first/last sample outside
//! the recorded range.

use recast_recording_model::CursorSample;

/// Sentinel coordinate for "no cursor to draw".
pub const OFFSCREEN: f64 = -1.0;

/// Fraction of the gap to the next sample during which a click stays
/// visually active. The recorder does not report button-up, so the glow
/// turns off after the first 30% of the gap.
const CLICK_HOLD_FRACTION: f64 = 0.3;

/// Interpolated cursor state at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorState {
    /// X in source pixels, or [`OFFSCREEN`].
    pub x: f64,
    /// Y in source pixels, or [`OFFSCREEN`].
    pub y: f64,
    /// Whether the click highlight should be drawn.
    pub is_clicking: bool,
}

impl CursorState {
    /// State for an empty sample list: callers must not draw a cursor.
    pub const HIDDEN: CursorState = CursorState {
        x: OFFSCREEN,
        y: OFFSCREEN,
        is_clicking: false,
    };

    /// Whether this state carries a drawable position.
    pub fn is_visible(&self) -> bool {
        self.x >= 0.0 && self.y >= 0.0
    }
}

/// Compute the cursor state at `time_ms`.
///
/// - Empty samples yield [`CursorState::HIDDEN`].
/// - Times before the first sample clamp to it (clicking only if that
///   sample is a click).
/// - Times past the last sample clamp to it with `is_clicking` forced off;
///   a click cannot still be active once the recording ends.
/// - In between, position interpolates linearly across the bracketing pair;
///   the click flag holds for the first [`CLICK_HOLD_FRACTION`] of the gap
///   after a click sample.
pub fn interpolate_cursor(samples: &[CursorSample], time_ms: f64) -> CursorState {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return CursorState::HIDDEN;
    };

    if time_ms <= first.time_ms {
        return CursorState {
            x: first.x,
            y: first.y,
            is_clicking: first.is_click(),
        };
    }

    if time_ms >= last.time_ms {
        return CursorState {
            x: last.x,
            y: last.y,
            is_clicking: false,
        };
    }

    let next_idx = samples.partition_point(|s| s.time_ms <= time_ms);
    let prev = samples[next_idx - 1];
    let next = samples[next_idx];

    let gap = next.time_ms - prev.time_ms;
    let alpha = if gap > 0.0 {
        (time_ms - prev.time_ms) / gap
    } else {
        0.0
    };

    CursorState {
        x: prev.x + (next.x - prev.x) * alpha,
        y: prev.y + (next.y - prev.y) * alpha,
        is_clicking: prev.is_click() && alpha < CLICK_HOLD_FRACTION,
    }
}
