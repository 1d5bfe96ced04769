//! Recast Recording Model
//!
//! Typed model of the payload the orchestration layer hands to the engine:
//! recorded cursor samples, zoom-in windows, and the processing-job records
//! the queue tracks. All timestamps are relative to recording start.

pub mod job;
pub mod sample;
pub mod zoom;

pub use job::*;
pub use sample::*;
pub use zoom::*;
