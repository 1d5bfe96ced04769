//! Process a recording into a final video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use recast_common::EngineConfig;
use recast_frame_compositor::SpriteCache;
use recast_recording_model::{
    normalize_samples, parse_cursor_samples, parse_zoom_windows, CursorSample, ZoomWindow,
};
use recast_render_engine::{ProgressCallback, TranscodePipeline};

pub async fn run(
    config: EngineConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    samples: Option<PathBuf>,
    zooms: Option<PathBuf>,
    style: String,
) -> anyhow::Result<()> {
    println!("Processing recording: {}", input.display());

    let output_path = output.unwrap_or_else(|| input.with_extension("processed.mp4"));

    let mut cursor_samples = load_samples(samples.as_deref())?;
    if normalize_samples(&mut cursor_samples) {
        tracing::warn!("Cursor samples were out of order; re-sorted by timestamp");
    }
    let zoom_windows = load_zooms(zooms.as_deref())?;

    println!("  Output: {}", output_path.display());
    println!("  Cursor samples: {}", cursor_samples.len());
    println!("  Zoom windows: {}", zoom_windows.len());
    println!("  Style: {style}");

    let sprites = Arc::new(SpriteCache::new(&config.sprites_dir));
    let pipeline = TranscodePipeline::new(config.transcode, config.timeouts, sprites);

    let progress_cb: ProgressCallback = Box::new(|fraction| {
        print!("\r  Progress: {:.1}%  ", fraction * 100.0);
        let _ = std::io::stdout().flush();
    });

    match pipeline
        .run(
            &input,
            &output_path,
            &cursor_samples,
            &zoom_windows,
            &style,
            Some(progress_cb),
        )
        .await
    {
        Ok(meta) => {
            println!(
                "\nDone: {} ({}x{} @ {:.2} fps, {} frames)",
                output_path.display(),
                meta.width,
                meta.height,
                meta.fps,
                meta.total_frames
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Processing failed: {e}")),
    }
}

fn load_samples(path: Option<&std::path::Path>) -> anyhow::Result<Vec<CursorSample>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    parse_cursor_samples(&json)
        .map_err(|e| anyhow::anyhow!("Invalid cursor samples in {}: {e}", path.display()))
}

fn load_zooms(path: Option<&std::path::Path>) -> anyhow::Result<Vec<ZoomWindow>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    parse_zoom_windows(&json)
        .map_err(|e| anyhow::anyhow!("Invalid zoom windows in {}: {e}", path.display()))
}
