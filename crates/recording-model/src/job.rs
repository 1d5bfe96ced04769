//! Processing-job records tracked by the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::CursorSample;
use crate::zoom::ZoomWindow;

/// Lifecycle of a processing job. `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

/// A request to post-process one recording.
///
/// `recording_id` is the identity/dedup key: a repeat submission for the
/// same id attaches to the existing job instead of enqueueing a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    pub recording_id: String,
    pub source_url: String,
    pub cursor_samples: Vec<CursorSample>,
    #[serde(default)]
    pub zoom_windows: Vec<ZoomWindow>,
    #[serde(default = "default_cursor_style")]
    pub cursor_style: String,
    pub project_id: String,
}

fn default_cursor_style() -> String {
    "normal".to_string()
}

/// Observable state of a job, as reported to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub recording_id: String,
    pub status: JobStatus,
    /// 0–100.
    pub progress_percent: u8,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Fresh pending record for a newly submitted recording.
    pub fn pending(recording_id: impl Into<String>) -> Self {
        Self {
            recording_id: recording_id.into(),
            status: JobStatus::Pending,
            progress_percent: 0,
            result_url: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }
}
