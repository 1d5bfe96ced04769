//! The queue's transcode seam.
//!
//! The worker only needs "turn this source file into this output file for
//! this request"; putting that behind a trait keeps the queue's dedup,
//! progress, and cleanup behavior testable without ffmpeg on the box.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use recast_common::{EngineConfig, RecastResult};
use recast_frame_compositor::SpriteCache;
use recast_recording_model::ProcessingRequest;
use recast_render_engine::{ProgressCallback, TranscodePipeline};

/// Executes the transcode step of a job.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        request: &ProcessingRequest,
        on_progress: ProgressCallback,
    ) -> RecastResult<()>;
}

/// Production transcoder backed by the ffmpeg pipeline.
pub struct FfmpegTranscoder {
    pipeline: TranscodePipeline,
}

impl FfmpegTranscoder {
    pub fn new(config: &EngineConfig) -> Self {
        let sprites = Arc::new(SpriteCache::new(&config.sprites_dir));
        Self {
            pipeline: TranscodePipeline::new(
                config.transcode.clone(),
                config.timeouts.clone(),
                sprites,
            ),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        request: &ProcessingRequest,
        on_progress: ProgressCallback,
    ) -> RecastResult<()> {
        self.pipeline
            .run(
                input,
                output,
                &request.cursor_samples,
                &request.zoom_windows,
                &request.cursor_style,
                Some(on_progress),
            )
            .await
            .map(|_| ())
    }
}
