//! Eased camera-zoom state.
//!
//! A zoom window holds full magnification through its middle and eases the
//! scale in over the first 15% and out over the last 15% of its duration,
//! so the camera never jumps. Only the magnitude eases; the focus point is
//! fixed for the life of the window.

use recast_recording_model::ZoomWindow;

/// Fraction of a window's duration spent easing in (and, mirrored, out).
const EASE_FRACTION: f64 = 0.15;

/// Zoom state for one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    /// Normalized focus X in `[0, 1]`.
    pub focus_x: f64,
    /// Normalized focus Y in `[0, 1]`.
    pub focus_y: f64,
    /// Current magnification (1.0 = no zoom).
    pub scale: f64,
}

impl ZoomState {
    /// No zoom: centered focus, unit scale.
    pub const IDENTITY: ZoomState = ZoomState {
        focus_x: 0.5,
        focus_y: 0.5,
        scale: 1.0,
    };

    /// Whether the compositor should bother cropping at this scale.
    pub fn is_zoomed(&self) -> bool {
        self.scale > 1.01
    }
}

/// Find the zoom state at `time_sec`.
///
/// Windows are scanned in declaration order and the first one containing
/// the timestamp wins (windows are assumed disjoint). No match, or a
/// degenerate zero-length window, yields [`ZoomState::IDENTITY`].
pub fn active_zoom(windows: &[ZoomWindow], time_sec: f64) -> ZoomState {
    let Some(window) = windows.iter().find(|w| w.contains(time_sec)) else {
        return ZoomState::IDENTITY;
    };

    if window.duration_sec <= 0.0 {
        return ZoomState::IDENTITY;
    }

    let progress = ((time_sec - window.start_sec) / window.duration_sec).clamp(0.0, 1.0);
    let ease = if progress < EASE_FRACTION {
        cubic_in_out(progress / EASE_FRACTION)
    } else if progress > 1.0 - EASE_FRACTION {
        cubic_in_out((1.0 - progress) / EASE_FRACTION)
    } else {
        1.0
    };

    ZoomState {
        focus_x: window.x,
        focus_y: window.y,
        scale: 1.0 + (window.scale - 1.0) * ease,
    }
}

/// Cubic in-out easing on `[0, 1]`.
pub fn cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}
