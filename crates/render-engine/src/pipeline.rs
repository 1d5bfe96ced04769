//! The decode → compose → encode pipeline.
//!
//! Two ffmpeg subprocesses run concurrently with this engine pumping frames
//! between them. Backpressure is the pipe discipline itself: the pump owns
//! a single frame buffer, reads the next frame from the decoder only after
//! the previous one was fully written to the encoder, and both `read` and
//! `write_all` suspend when the respective pipe is empty/full. Frames are
//! forwarded strictly in source order.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, Command};

use recast_common::{RecastError, RecastResult, TimeoutConfig, TranscodeConfig};
use recast_frame_compositor::{compose, SpriteCache};
use recast_processing_core::frame_state;
use recast_recording_model::{CursorSample, ZoomWindow};

use crate::probe::{probe_video, VideoMeta};

/// Progress callback: fraction complete in `[0, 1]`.
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

const PROGRESS_EVERY_FRAMES: u64 = 50;
const STALL_WARN_SECS: u64 = 10;

/// One full transcode of a recording.
pub struct TranscodePipeline {
    transcode: TranscodeConfig,
    timeouts: TimeoutConfig,
    sprites: Arc<SpriteCache>,
}

impl TranscodePipeline {
    pub fn new(
        transcode: TranscodeConfig,
        timeouts: TimeoutConfig,
        sprites: Arc<SpriteCache>,
    ) -> Self {
        Self {
            transcode,
            timeouts,
            sprites,
        }
    }

    /// Transcode `input` into `output`, compositing every frame.
    ///
    /// The encoder takes its video stream from the pixel pipe and re-muxes
    /// the audio track of the untouched `input` file. Any failure along the
    /// way aborts both subprocesses and surfaces the error; a partial
    /// output file is never reported as success.
    pub async fn run(
        &self,
        input: &Path,
        output: &Path,
        samples: &[CursorSample],
        windows: &[ZoomWindow],
        style: &str,
        on_progress: Option<ProgressCallback>,
    ) -> RecastResult<VideoMeta> {
        let started = Instant::now();
        let meta = probe_video(&self.transcode.ffprobe, input).await?;
        tracing::info!(
            width = meta.width,
            height = meta.height,
            fps = meta.fps,
            total_frames = meta.total_frames,
            input = %input.display(),
            "Probed transcode input"
        );

        let mut decoder = self.spawn_decoder(input)?;
        let mut encoder = self.spawn_encoder(input, output, &meta)?;

        let decoder_out = decoder
            .stdout
            .take()
            .ok_or_else(|| RecastError::transcode("Failed to capture decoder stdout"))?;
        let encoder_in = encoder
            .stdin
            .take()
            .ok_or_else(|| RecastError::transcode("Failed to capture encoder stdin"))?;
        let decoder_err = drain_stderr(decoder.stderr.take());
        let encoder_err = drain_stderr(encoder.stderr.take());

        let pumped = pump_frames(
            decoder_out,
            encoder_in,
            &meta,
            samples,
            windows,
            style,
            &self.sprites,
            on_progress.as_ref(),
            Duration::from_secs(self.timeouts.frame_io_secs),
        )
        .await;

        let frames = match pumped {
            Ok(frames) => frames,
            Err(e) => {
                kill_both(&mut decoder, &mut encoder).await;
                return Err(e);
            }
        };

        let finish_budget = Duration::from_secs(self.timeouts.encoder_finish_secs);
        let decoder_status = match wait_bounded(&mut decoder, finish_budget, "decoder").await {
            Ok(status) => status,
            Err(e) => {
                kill_both(&mut decoder, &mut encoder).await;
                return Err(e);
            }
        };
        let encoder_status = wait_bounded(&mut encoder, finish_budget, "encoder").await?;

        let decoder_stderr = decoder_err.await.unwrap_or_default();
        let encoder_stderr = encoder_err.await.unwrap_or_default();

        if !decoder_status.success() {
            return Err(RecastError::transcode(format!(
                "Decoder exited with {decoder_status}: {}",
                decoder_stderr.trim()
            )));
        }
        if !encoder_status.success() {
            return Err(RecastError::transcode(format!(
                "Encoder exited with {encoder_status}: {}",
                encoder_stderr.trim()
            )));
        }

        if let Some(cb) = &on_progress {
            cb(1.0);
        }
        tracing::info!(
            frames,
            elapsed_secs = started.elapsed().as_secs_f64(),
            output = %output.display(),
            "Transcode finished"
        );
        Ok(meta)
    }

    fn spawn_decoder(&self, input: &Path) -> RecastResult<Child> {
        let args = decoder_args(input);
        tracing::debug!(?args, "Spawning decoder");
        Command::new(&self.transcode.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecastError::transcode(format!("Failed to start decoder: {e}")))
    }

    fn spawn_encoder(&self, input: &Path, output: &Path, meta: &VideoMeta) -> RecastResult<Child> {
        let args = encoder_args(input, output, meta, &self.transcode);
        tracing::debug!(?args, "Spawning encoder");
        Command::new(&self.transcode.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecastError::transcode(format!("Failed to start encoder: {e}")))
    }
}

/// Decoder invocation: emit the input as a raw RGBA frame stream on stdout.
fn decoder_args(input: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-an".to_string(),
        "pipe:1".to_string(),
    ]
}

/// Encoder invocation: raw RGBA frames on stdin become the video stream;
/// the untouched input file is a second input contributing its audio track.
fn encoder_args(
    input: &Path,
    output: &Path,
    meta: &VideoMeta,
    config: &TranscodeConfig,
) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-video_size".to_string(),
        format!("{}x{}", meta.width, meta.height),
        "-framerate".to_string(),
        format!("{:.4}", meta.fps),
        "-i".to_string(),
        "pipe:0".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0?".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        config.preset.clone(),
        "-crf".to_string(),
        config.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.display().to_string(),
    ]
}

/// The stream loop: read one raw frame, composite it, forward it.
///
/// Generic over the byte channels so the bounded-memory behavior is
/// testable over in-memory duplex pipes. Holds exactly one frame buffer
/// for the life of the stream. Every read and write is covered by
/// `io_budget`, so a subprocess that stalls without exiting fails the job
/// instead of wedging it.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn pump_frames<R, W>(
    mut frames_in: R,
    mut frames_out: W,
    meta: &VideoMeta,
    samples: &[CursorSample],
    windows: &[ZoomWindow],
    style: &str,
    sprites: &SpriteCache,
    on_progress: Option<&ProgressCallback>,
    io_budget: Duration,
) -> RecastResult<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let frame_bytes = meta.frame_size_bytes();
    let mut buf = vec![0u8; frame_bytes];
    let mut frame_index: u64 = 0;

    loop {
        let filled = bounded_io(
            read_frame(&mut frames_in, &mut buf),
            io_budget,
            "decoder read",
            frame_index,
        )
        .await?;

        if filled == 0 {
            break;
        }
        if filled < frame_bytes {
            tracing::warn!(
                frame = frame_index,
                bytes = filled,
                expected = frame_bytes,
                "Discarding partial trailing frame"
            );
            break;
        }

        let time_ms = frame_index as f64 / meta.fps * 1000.0;
        let state = frame_state(samples, windows, time_ms);

        let image = RgbaImage::from_raw(meta.width, meta.height, std::mem::take(&mut buf))
            .ok_or_else(|| {
                RecastError::compose(format!(
                    "Frame {frame_index} buffer does not match {}x{} RGBA",
                    meta.width, meta.height
                ))
            })?;
        let composed = compose(image, &state, style, sprites);
        buf = composed.into_raw();
        if buf.len() != frame_bytes {
            return Err(RecastError::compose(format!(
                "Composited frame {frame_index} has {} bytes, expected {frame_bytes}",
                buf.len()
            )));
        }

        bounded_io(
            frames_out.write_all(&buf),
            io_budget,
            "encoder write",
            frame_index,
        )
        .await?;

        if frame_index % PROGRESS_EVERY_FRAMES == 0 {
            if let Some(cb) = on_progress {
                cb((frame_index as f64 / meta.total_frames.max(1) as f64).min(1.0));
            }
        }
        frame_index += 1;
    }

    // End-of-stream from the decoder: close the encoder's input so it can
    // finalize the container.
    bounded_io(frames_out.shutdown(), io_budget, "encoder close", frame_index).await?;

    Ok(frame_index)
}

/// Await one pipe operation with a stall warning and a hard budget.
///
/// Warns once after [`STALL_WARN_SECS`] of no completion, while still
/// waiting; fails with a timeout when the budget expires. Cancelling the
/// pending operation is safe here because expiry aborts the whole pipeline.
async fn bounded_io<F, T>(
    op: F,
    budget: Duration,
    what: &'static str,
    frame: u64,
) -> RecastResult<T>
where
    F: std::future::Future<Output = std::io::Result<T>>,
{
    tokio::pin!(op);
    let warn_at = tokio::time::sleep(Duration::from_secs(STALL_WARN_SECS));
    tokio::pin!(warn_at);
    let deadline = tokio::time::sleep(budget);
    tokio::pin!(deadline);
    let mut warned = false;

    loop {
        tokio::select! {
            result = op.as_mut() => {
                return result.map_err(|e| {
                    RecastError::transcode(format!("Frame {frame}: {what} failed: {e}"))
                });
            }
            _ = warn_at.as_mut(), if !warned => {
                warned = true;
                tracing::warn!(frame, what, "Frame stream stalled");
            }
            _ = deadline.as_mut() => {
                return Err(RecastError::timeout(format!(
                    "{what} made no progress for {}s at frame {frame}",
                    budget.as_secs()
                )));
            }
        }
    }
}

/// Fill `buf` completely, or as far as the stream allows. Returns the byte
/// count actually read; 0 means clean end-of-stream.
async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Collect a child's stderr without letting a full pipe block it.
fn drain_stderr(stderr: Option<ChildStderr>) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let Some(mut stderr) = stderr else {
            return String::new();
        };
        let mut output = String::new();
        if stderr.read_to_string(&mut output).await.is_err() {
            output.push_str("<failed to read stderr>");
        }
        output
    })
}

/// Wait for a child with a budget; kill it if the budget expires.
async fn wait_bounded(
    child: &mut Child,
    budget: Duration,
    name: &str,
) -> RecastResult<ExitStatus> {
    match tokio::time::timeout(budget, child.wait()).await {
        Ok(Ok(status)) => Ok(status),
        Ok(Err(e)) => Err(RecastError::transcode(format!(
            "Failed to wait on {name}: {e}"
        ))),
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(RecastError::timeout(format!(
                "{name} did not exit within {}s",
                budget.as_secs()
            )))
        }
    }
}

/// Abort both subprocesses promptly after a pipeline failure.
async fn kill_both(decoder: &mut Child, encoder: &mut Child) {
    let _ = decoder.start_kill();
    let _ = encoder.start_kill();
    let _ = decoder.wait().await;
    let _ = encoder.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::duplex;

    fn tiny_meta() -> VideoMeta {
        VideoMeta {
            width: 4,
            height: 3,
            fps: 30.0,
            total_frames: 200,
        }
    }

    fn tagged_frame(frame_bytes: usize, tag: u8) -> Vec<u8> {
        let mut frame = vec![0u8; frame_bytes];
        for px in frame.chunks_exact_mut(4) {
            px[0] = tag;
            px[3] = 255;
        }
        frame
    }

    #[tokio::test]
    async fn test_pump_preserves_order_through_tiny_pipes() {
        let meta = tiny_meta();
        let frame_bytes = meta.frame_size_bytes();
        let frame_count = 200usize;

        // Pipe buffers smaller than a single frame: the pump must make
        // progress frame by frame, never by buffering ahead.
        let (mut decoder_tx, decoder_rx) = duplex(31);
        let (encoder_tx, mut encoder_rx) = duplex(31);

        let producer = tokio::spawn(async move {
            for i in 0..frame_count {
                let frame = tagged_frame(frame_bytes, (i % 251) as u8);
                decoder_tx.write_all(&frame).await.unwrap();
            }
        });

        let consumer = tokio::spawn(async move {
            let mut seen = Vec::new();
            let mut buf = vec![0u8; frame_bytes];
            loop {
                let n = read_frame(&mut encoder_rx, &mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                assert_eq!(n, frame_bytes);
                seen.push(buf[0]);
            }
            seen
        });

        let dir = tempfile::tempdir().unwrap();
        let sprites = SpriteCache::new(dir.path());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_in_cb = Arc::clone(&calls);
        let on_progress: ProgressCallback = Box::new(move |p| {
            calls_in_cb.lock().unwrap().push(p);
        });

        let pumped = pump_frames(
            decoder_rx,
            encoder_tx,
            &meta,
            &[],
            &[],
            "normal",
            &sprites,
            Some(&on_progress),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        producer.await.unwrap();
        let seen = consumer.await.unwrap();

        assert_eq!(pumped, frame_count as u64);
        assert_eq!(seen.len(), frame_count);
        for (i, tag) in seen.iter().enumerate() {
            assert_eq!(*tag, (i % 251) as u8, "frame {i} out of order");
        }

        // Reported every 50 frames, monotonically.
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert!(calls.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_partial_trailing_frame_ends_stream() {
        let meta = tiny_meta();
        let frame_bytes = meta.frame_size_bytes();

        let (mut decoder_tx, decoder_rx) = duplex(4096);
        let (encoder_tx, _encoder_rx) = duplex(4096);

        decoder_tx
            .write_all(&tagged_frame(frame_bytes, 1))
            .await
            .unwrap();
        decoder_tx
            .write_all(&tagged_frame(frame_bytes, 2))
            .await
            .unwrap();
        decoder_tx
            .write_all(&vec![0u8; frame_bytes / 2])
            .await
            .unwrap();
        drop(decoder_tx);

        let dir = tempfile::tempdir().unwrap();
        let sprites = SpriteCache::new(dir.path());

        let pumped = pump_frames(
            decoder_rx,
            encoder_tx,
            &meta,
            &[],
            &[],
            "normal",
            &sprites,
            None,
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        assert_eq!(pumped, 2);
    }

    #[tokio::test]
    async fn test_stalled_decoder_fails_within_budget() {
        let meta = tiny_meta();
        let frame_bytes = meta.frame_size_bytes();

        // Half a frame, then silence with the pipe still open: the decoder
        // is alive but wedged.
        let (mut decoder_tx, decoder_rx) = duplex(4096);
        let (encoder_tx, _encoder_rx) = duplex(4096);
        decoder_tx
            .write_all(&vec![0u8; frame_bytes / 2])
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let sprites = SpriteCache::new(dir.path());

        let err = pump_frames(
            decoder_rx,
            encoder_tx,
            &meta,
            &[],
            &[],
            "normal",
            &sprites,
            None,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RecastError::Timeout { .. }), "got {err}");
        drop(decoder_tx);
    }

    #[tokio::test]
    async fn test_stalled_encoder_fails_within_budget() {
        let meta = tiny_meta();
        let frame_bytes = meta.frame_size_bytes();

        // Encoder pipe smaller than a frame and never drained: the first
        // write can only partially complete, then blocks.
        let (mut decoder_tx, decoder_rx) = duplex(4096);
        let (encoder_tx, _encoder_rx) = duplex(8);
        decoder_tx
            .write_all(&tagged_frame(frame_bytes, 7))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let sprites = SpriteCache::new(dir.path());

        let err = pump_frames(
            decoder_rx,
            encoder_tx,
            &meta,
            &[],
            &[],
            "normal",
            &sprites,
            None,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RecastError::Timeout { .. }), "got {err}");
        drop(decoder_tx);
    }

    #[test]
    fn test_decoder_args_request_raw_rgba() {
        let args = decoder_args(Path::new("/tmp/in.mp4"));
        assert!(args.windows(2).any(|w| w == ["-f", "rawvideo"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "rgba"]));
        assert_eq!(args.last().unwrap(), "pipe:1");
    }

    #[test]
    fn test_encoder_args_remux_original_audio() {
        let meta = VideoMeta {
            width: 640,
            height: 360,
            fps: 30.0,
            total_frames: 90,
        };
        let args = encoder_args(
            Path::new("/tmp/in.mp4"),
            Path::new("/tmp/out.mp4"),
            &meta,
            &TranscodeConfig::default(),
        );

        // Video from the pipe, audio (if any) from the untouched source.
        assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a:0?"]));
        assert!(args.windows(2).any(|w| w == ["-i", "pipe:0"]));
        assert!(args.windows(2).any(|w| w == ["-i", "/tmp/in.mp4"]));
        assert!(args.windows(2).any(|w| w == ["-video_size", "640x360"]));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }
}
