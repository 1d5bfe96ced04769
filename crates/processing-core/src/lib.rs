//! Recast Processing Core
//!
//! Pure time-indexed lookups over the sparse event streams a recording
//! carries: given cursor samples, zoom windows, and an arbitrary continuous
//! timestamp, produce the cursor position, click flag, and eased zoom state
//! for that instant. No I/O and no cross-frame state: every frame's state is
//! recomputed independently.

pub mod interpolate;
pub mod zoom;

pub use interpolate::{interpolate_cursor, CursorState};
pub use zoom::{active_zoom, cubic_in_out, ZoomState};

use recast_recording_model::{CursorSample, ZoomWindow};

/// Everything the compositor needs to know about one output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub cursor: CursorState,
    pub zoom: ZoomState,
}

/// Compute the full per-frame state for a timestamp in milliseconds.
pub fn frame_state(samples: &[CursorSample], windows: &[ZoomWindow], time_ms: f64) -> FrameState {
    FrameState {
        cursor: interpolate_cursor(samples, time_ms),
        zoom: active_zoom(windows, time_ms / 1000.0),
    }
}
