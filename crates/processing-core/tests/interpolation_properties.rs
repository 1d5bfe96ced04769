use proptest::prelude::*;

use recast_processing_core::{active_zoom, cubic_in_out, interpolate_cursor};
use recast_recording_model::{CursorSample, ZoomWindow};

proptest! {
    #[test]
    fn cubic_in_out_stays_in_unit_range(t in -1.0f64..2.0) {
        let v = cubic_in_out(t);
        prop_assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn cubic_in_out_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(cubic_in_out(lo) <= cubic_in_out(hi) + 1e-12);
    }

    #[test]
    fn interpolated_position_stays_within_sample_hull(
        times in proptest::collection::vec(0.0f64..10_000.0, 2..20),
        query in 0.0f64..10_000.0,
    ) {
        let mut times = times;
        times.sort_by(f64::total_cmp);

        let samples: Vec<CursorSample> = times
            .iter()
            .enumerate()
            .map(|(i, &t)| CursorSample::moved(t, (i * 13 % 640) as f64, (i * 29 % 360) as f64))
            .collect();

        let state = interpolate_cursor(&samples, query);
        let min_x = samples.iter().map(|s| s.x).fold(f64::INFINITY, f64::min);
        let max_x = samples.iter().map(|s| s.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = samples.iter().map(|s| s.y).fold(f64::INFINITY, f64::min);
        let max_y = samples.iter().map(|s| s.y).fold(f64::NEG_INFINITY, f64::max);

        prop_assert!(state.x >= min_x - 1e-9 && state.x <= max_x + 1e-9);
        prop_assert!(state.y >= min_y - 1e-9 && state.y <= max_y + 1e-9);
    }

    #[test]
    fn zoom_scale_never_exceeds_window_target(
        start in 0.0f64..60.0,
        duration in 0.1f64..30.0,
        target in 1.0f64..4.0,
        query in 0.0f64..120.0,
    ) {
        let windows = vec![ZoomWindow {
            start_sec: start,
            x: 0.5,
            y: 0.5,
            scale: target,
            duration_sec: duration,
        }];

        let state = active_zoom(&windows, query);
        prop_assert!(state.scale >= 1.0 - 1e-12);
        prop_assert!(state.scale <= target + 1e-12);
    }
}
