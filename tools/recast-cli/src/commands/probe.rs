//! Show stream metadata for a recording.

use std::path::PathBuf;

use recast_common::EngineConfig;
use recast_render_engine::probe_video;

pub async fn run(config: &EngineConfig, input: PathBuf) -> anyhow::Result<()> {
    let meta = probe_video(&config.transcode.ffprobe, &input)
        .await
        .map_err(|e| anyhow::anyhow!("Probe failed: {e}"))?;

    println!("Recording: {}", input.display());
    println!("  Resolution: {}x{}", meta.width, meta.height);
    println!("  Frame rate: {:.3} fps", meta.fps);
    println!("  Frames: {}", meta.total_frames);
    println!(
        "  Raw frame size: {:.1} MiB",
        meta.frame_size_bytes() as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}
