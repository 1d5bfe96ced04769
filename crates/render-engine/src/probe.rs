//! Input metadata probe.
//!
//! Runs ffprobe against the source file before any transcode. A failed
//! probe is fatal for the job: without real dimensions and frame rate the
//! raw pixel pipe cannot be sized.

use std::path::Path;

use tokio::process::Command;

use recast_common::{RecastError, RecastResult};

/// Probed stream geometry and timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container-reported frame count, or `duration * fps` when the
    /// container omits it. An estimate: used for progress only.
    pub total_frames: u64,
}

impl VideoMeta {
    /// Bytes per raw RGBA frame.
    pub fn frame_size_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Probe `path` with the given ffprobe binary.
pub async fn probe_video(ffprobe: &str, path: &Path) -> RecastResult<VideoMeta> {
    if !path.exists() {
        return Err(RecastError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| RecastError::probe(format!("Failed to run {ffprobe}: {e}")))?;

    if !output.status.success() {
        return Err(RecastError::probe(format!(
            "{ffprobe} failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe csv output: one stream line
/// (`width,height,r_frame_rate,nb_frames`) followed by one format line
/// (`duration`).
fn parse_probe_output(raw: &str) -> RecastResult<VideoMeta> {
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty());

    let stream = lines
        .next()
        .ok_or_else(|| RecastError::probe("ffprobe reported no video stream"))?;
    let fields: Vec<&str> = stream.trim().split(',').collect();
    if fields.len() < 3 {
        return Err(RecastError::probe(format!(
            "Unexpected ffprobe stream line: {stream:?}"
        )));
    }

    let width: u32 = fields[0]
        .parse()
        .map_err(|_| RecastError::probe(format!("Bad width: {:?}", fields[0])))?;
    let height: u32 = fields[1]
        .parse()
        .map_err(|_| RecastError::probe(format!("Bad height: {:?}", fields[1])))?;
    let fps = parse_rate(fields[2])?;

    let nb_frames = fields.get(3).and_then(|s| s.trim().parse::<u64>().ok());
    let duration = lines.next().and_then(|l| l.trim().parse::<f64>().ok());

    let total_frames = nb_frames
        .or_else(|| duration.map(|d| (d * fps).ceil() as u64))
        .ok_or_else(|| RecastError::probe("ffprobe reported neither frame count nor duration"))?;

    Ok(VideoMeta {
        width,
        height,
        fps,
        total_frames,
    })
}

/// Parse an ffprobe rational rate ("30000/1001") or plain number ("30").
fn parse_rate(raw: &str) -> RecastResult<f64> {
    let raw = raw.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num
                .parse()
                .map_err(|_| RecastError::probe(format!("Bad frame rate: {raw:?}")))?;
            let den: f64 = den
                .parse()
                .map_err(|_| RecastError::probe(format!("Bad frame rate: {raw:?}")))?;
            if den == 0.0 {
                return Err(RecastError::probe(format!("Bad frame rate: {raw:?}")));
            }
            num / den
        }
        None => raw
            .parse()
            .map_err(|_| RecastError::probe(format!("Bad frame rate: {raw:?}")))?,
    };

    if value <= 0.0 || !value.is_finite() {
        return Err(RecastError::probe(format!(
            "Non-positive frame rate: {raw:?}"
        )));
    }
    Ok(value)
}
