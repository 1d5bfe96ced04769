//! Recast Render Engine
//!
//! Drives one ffmpeg decode subprocess and one ffmpeg encode subprocess
//! with this engine in the middle: raw RGBA frames stream out of the
//! decoder, are composited one at a time, and stream into the encoder,
//! which re-muxes the original file's audio track alongside the new video.
//! The pump never holds more than one frame in flight, so memory stays
//! bounded regardless of video length.

pub mod pipeline;
pub mod probe;

pub use pipeline::{ProgressCallback, TranscodePipeline};
pub use probe::{probe_video, VideoMeta};
