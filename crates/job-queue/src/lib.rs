//! Recast Job Queue
//!
//! A single-worker scheduler for "process this recording" requests:
//! deduplicates by recording id, runs jobs strictly one at a time
//! (download → transcode → upload), tracks status and progress, and lets
//! concurrent callers await the same in-flight job. Exactly one transcode
//! runs process-wide; concurrent submissions serialize.

pub mod queue;
pub mod storage;
pub mod transcoder;

pub use queue::{ProcessingQueue, SubmitOutcome};
pub use storage::{FsStore, HttpStore, ObjectStore};
pub use transcoder::{FfmpegTranscoder, Transcoder};
