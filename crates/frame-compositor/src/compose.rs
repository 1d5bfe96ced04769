//! Per-frame composition.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use recast_processing_core::{FrameState, ZoomState};

use crate::sprite::SpriteCache;

/// Half-size of the square patch blurred over the native cursor glyph.
pub const CURSOR_BLUR_RADIUS: u32 = 25;

/// Side length of the click-glow box.
pub const CLICK_GLOW_SIZE: u32 = 60;

const CURSOR_BLUR_SIGMA: f32 = 8.0;
const GLOW_BLUR_SIGMA: f32 = 4.0;
const GLOW_TINT: [u8; 3] = [255, 221, 130];
const GLOW_PEAK_ALPHA: f32 = 90.0;

/// Transform one raw frame according to the interpolated frame state.
///
/// Applies, in order: zoom crop+resize (with cursor remap), native-cursor
/// blur, click glow, and sprite overlay. If the cursor state carries no
/// drawable position, only the zoom step runs and the frame is otherwise
/// returned unchanged. Takes the frame by value and returns the transformed
/// buffer; the caller's copy is never aliased.
pub fn compose(
    frame: RgbaImage,
    state: &FrameState,
    style: &str,
    sprites: &SpriteCache,
) -> RgbaImage {
    let (mut frame, (cursor_x, cursor_y)) = if state.zoom.is_zoomed() {
        apply_zoom(frame, &state.zoom, state.cursor.x, state.cursor.y)
    } else {
        (frame, (state.cursor.x, state.cursor.y))
    };

    if !state.cursor.is_visible() {
        return frame;
    }

    if cursor_x >= 0.0 && cursor_y >= 0.0 {
        blur_cursor_region(&mut frame, cursor_x, cursor_y);

        if state.cursor.is_clicking {
            draw_click_glow(&mut frame, cursor_x, cursor_y);
        }

        if let Some(sprite) = sprites.get(style) {
            overlay_sprite(&mut frame, &sprite, cursor_x, cursor_y);
        }
    }

    frame
}

/// Crop a `1/scale` window around the focus point and upscale it back to
/// full size, then remap the cursor into the zoomed coordinate space.
fn apply_zoom(
    frame: RgbaImage,
    zoom: &ZoomState,
    cursor_x: f64,
    cursor_y: f64,
) -> (RgbaImage, (f64, f64)) {
    let (width, height) = frame.dimensions();

    let crop_w = ((width as f64 / zoom.scale).floor() as u32).clamp(1, width);
    let crop_h = ((height as f64 / zoom.scale).floor() as u32).clamp(1, height);

    let focus_x = zoom.focus_x * width as f64;
    let focus_y = zoom.focus_y * height as f64;
    let crop_x = (focus_x - crop_w as f64 / 2.0).clamp(0.0, (width - crop_w) as f64) as u32;
    let crop_y = (focus_y - crop_h as f64 / 2.0).clamp(0.0, (height - crop_h) as f64) as u32;

    let region = imageops::crop_imm(&frame, crop_x, crop_y, crop_w, crop_h).to_image();
    let zoomed = imageops::resize(&region, width, height, FilterType::Lanczos3);

    let remapped_x = (cursor_x - crop_x as f64) * zoom.scale;
    let remapped_y = (cursor_y - crop_y as f64) * zoom.scale;

    (zoomed, (remapped_x, remapped_y))
}

/// Blur the square patch around the cursor to erase the native OS glyph
/// captured in the source pixels. The patch is clipped to frame bounds and
/// skipped entirely when the clip leaves nothing.
fn blur_cursor_region(frame: &mut RgbaImage, cursor_x: f64, cursor_y: f64) {
    let (width, height) = frame.dimensions();
    let radius = CURSOR_BLUR_RADIUS as i64;

    let x0 = (cursor_x as i64 - radius).max(0);
    let y0 = (cursor_y as i64 - radius).max(0);
    let x1 = (cursor_x as i64 + radius).min(width as i64);
    let y1 = (cursor_y as i64 + radius).min(height as i64);
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let patch = imageops::crop_imm(
        &*frame,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image();
    let blurred = imageops::blur(&patch, CURSOR_BLUR_SIGMA);
    imageops::replace(frame, &blurred, x0, y0);
}

/// Overlay a soft radial highlight at the click position. `overlay` clips
/// against the frame, so edge positions need no special casing.
fn draw_click_glow(frame: &mut RgbaImage, cursor_x: f64, cursor_y: f64) {
    let radius = CLICK_GLOW_SIZE as f32 / 2.0;
    let glow = RgbaImage::from_fn(CLICK_GLOW_SIZE, CLICK_GLOW_SIZE, |x, y| {
        let dx = x as f32 + 0.5 - radius;
        let dy = y as f32 + 0.5 - radius;
        let falloff = (1.0 - (dx * dx + dy * dy).sqrt() / radius).max(0.0);
        Rgba([
            GLOW_TINT[0],
            GLOW_TINT[1],
            GLOW_TINT[2],
            (falloff * GLOW_PEAK_ALPHA) as u8,
        ])
    });
    let glow = imageops::blur(&glow, GLOW_BLUR_SIGMA);

    let half = (CLICK_GLOW_SIZE / 2) as i64;
    imageops::overlay(frame, &glow, cursor_x as i64 - half, cursor_y as i64 - half);
}

/// Composite the cursor sprite, clamped so it never extends past an edge.
fn overlay_sprite(frame: &mut RgbaImage, sprite: &RgbaImage, cursor_x: f64, cursor_y: f64) {
    let (width, height) = frame.dimensions();
    let (sprite_w, sprite_h) = sprite.dimensions();

    let max_x = width.saturating_sub(sprite_w) as i64;
    let max_y = height.saturating_sub(sprite_h) as i64;
    let x = (cursor_x.round() as i64).clamp(0, max_x.max(0));
    let y = (cursor_y.round() as i64).clamp(0, max_y.max(0));

    imageops::overlay(frame, sprite, x, y);
}
