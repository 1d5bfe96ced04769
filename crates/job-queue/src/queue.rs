//! The processing queue.
//!
//! An owned scheduler object: the job table lives behind a mutex, an mpsc
//! channel feeds a single spawned worker, and the worker is the sole
//! mutator of job records. Each job carries a watch channel so duplicate
//! submitters and status pollers observe the same terminal result without
//! touching the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, watch};

use recast_common::{RecastError, RecastResult, TimeoutConfig};
use recast_recording_model::{normalize_samples, JobSnapshot, JobStatus, ProcessingRequest};
use recast_render_engine::ProgressCallback;

use crate::storage::ObjectStore;
use crate::transcoder::Transcoder;

/// Progress contribution of each job stage, in percent.
const DOWNLOAD_DONE_PCT: f64 = 20.0;
const TRANSCODE_DONE_PCT: f64 = 70.0;

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The recording was already processed; here is its result.
    Completed(String),
    /// A job is pending or in flight (newly created or attached-to).
    Pending,
}

/// Handle to the single-worker processing queue.
#[derive(Clone)]
pub struct ProcessingQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    scratch_dir: PathBuf,
    timeouts: TimeoutConfig,
    store: Arc<dyn ObjectStore>,
    transcoder: Arc<dyn Transcoder>,
    jobs: Mutex<HashMap<String, JobEntry>>,
    submit_tx: mpsc::UnboundedSender<ProcessingRequest>,
}

struct JobEntry {
    tx: watch::Sender<JobSnapshot>,
}

impl ProcessingQueue {
    /// Create the queue and spawn its worker. Jobs run strictly
    /// sequentially on that one worker.
    pub fn new(
        scratch_dir: impl Into<PathBuf>,
        timeouts: TimeoutConfig,
        store: Arc<dyn ObjectStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let (submit_tx, mut submit_rx) = mpsc::unbounded_channel::<ProcessingRequest>();
        let inner = Arc::new(QueueInner {
            scratch_dir: scratch_dir.into(),
            timeouts,
            store,
            transcoder,
            jobs: Mutex::new(HashMap::new()),
            submit_tx,
        });

        let worker = Arc::clone(&inner);
        tokio::spawn(async move {
            tracing::info!("Processing queue worker started");
            while let Some(request) = submit_rx.recv().await {
                run_job(&worker, request).await;
            }
            tracing::info!("Processing queue worker stopped");
        });

        Self { inner }
    }

    /// Submit a recording for processing.
    ///
    /// A repeat submission for an id that is pending, in flight, or
    /// complete attaches to the existing job. A failed job is replaced by
    /// a fresh attempt, so failures are retried only on resubmission.
    pub fn submit(&self, mut request: ProcessingRequest) -> SubmitOutcome {
        let mut jobs = lock_jobs(&self.inner.jobs);

        if let Some(entry) = jobs.get(&request.recording_id) {
            let snapshot = entry.tx.borrow().clone();
            match snapshot.status {
                JobStatus::Complete => {
                    return match snapshot.result_url {
                        Some(url) => SubmitOutcome::Completed(url),
                        None => SubmitOutcome::Pending,
                    };
                }
                JobStatus::Pending | JobStatus::Processing => {
                    tracing::debug!(
                        recording_id = %request.recording_id,
                        "Attaching to in-flight job"
                    );
                    return SubmitOutcome::Pending;
                }
                JobStatus::Failed => {
                    tracing::info!(
                        recording_id = %request.recording_id,
                        "Resubmitting previously failed recording"
                    );
                }
            }
        }

        if normalize_samples(&mut request.cursor_samples) {
            tracing::warn!(
                recording_id = %request.recording_id,
                "Cursor samples arrived out of order; re-sorted"
            );
        }

        let (tx, _rx) = watch::channel(JobSnapshot::pending(&request.recording_id));
        jobs.insert(request.recording_id.clone(), JobEntry { tx });
        drop(jobs);

        // The worker outlives every sender, so this only fails during
        // shutdown; the job then stays Pending and is never picked up.
        if self.inner.submit_tx.send(request).is_err() {
            tracing::error!("Queue worker is gone; submission dropped");
        }
        SubmitOutcome::Pending
    }

    /// Current snapshot of a job, if the recording id is known.
    pub fn get_status(&self, recording_id: &str) -> Option<JobSnapshot> {
        let jobs = lock_jobs(&self.inner.jobs);
        jobs.get(recording_id).map(|e| e.tx.borrow().clone())
    }

    /// Await the terminal snapshot of a job.
    pub async fn wait(&self, recording_id: &str) -> RecastResult<JobSnapshot> {
        let mut rx = {
            let jobs = lock_jobs(&self.inner.jobs);
            jobs.get(recording_id)
                .map(|e| e.tx.subscribe())
                .ok_or_else(|| {
                    RecastError::queue(format!("Unknown recording id: {recording_id}"))
                })?
        };

        let snapshot = rx
            .wait_for(|s| s.status.is_terminal())
            .await
            .map_err(|_| RecastError::queue("Queue worker stopped before the job finished"))?
            .clone();
        Ok(snapshot)
    }
}

fn lock_jobs(
    jobs: &Mutex<HashMap<String, JobEntry>>,
) -> std::sync::MutexGuard<'_, HashMap<String, JobEntry>> {
    jobs.lock().unwrap_or_else(|e| e.into_inner())
}

fn update_job(inner: &QueueInner, recording_id: &str, f: impl FnOnce(&mut JobSnapshot)) {
    let jobs = lock_jobs(&inner.jobs);
    if let Some(entry) = jobs.get(recording_id) {
        entry.tx.send_modify(f);
    }
}

fn set_progress(inner: &QueueInner, recording_id: &str, percent: f64) {
    update_job(inner, recording_id, |s| {
        s.progress_percent = percent.clamp(0.0, 100.0) as u8;
    });
}

/// Run one job to a terminal state. Errors never escape: every exit path
/// cleans the scratch directory and records the outcome, and the worker
/// loop advances to the next job.
async fn run_job(inner: &Arc<QueueInner>, request: ProcessingRequest) {
    let recording_id = request.recording_id.clone();
    let started = Instant::now();

    update_job(inner, &recording_id, |s| {
        s.status = JobStatus::Processing;
        s.started_at = Some(Utc::now());
    });
    tracing::info!(recording_id = %recording_id, source = %request.source_url, "Job started");

    let scratch = inner.scratch_dir.join(&recording_id);
    let result = process_one(inner, &request, &scratch).await;

    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                recording_id = %recording_id,
                error = %e,
                "Failed to remove scratch directory"
            );
        }
    }

    match result {
        Ok(url) => {
            update_job(inner, &recording_id, |s| {
                s.status = JobStatus::Complete;
                s.progress_percent = 100;
                s.result_url = Some(url.clone());
                s.completed_at = Some(Utc::now());
            });
            tracing::info!(
                recording_id = %recording_id,
                result = %url,
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Job complete"
            );
        }
        Err(e) => {
            let message = e.to_string();
            update_job(inner, &recording_id, |s| {
                s.status = JobStatus::Failed;
                s.error = Some(message.clone());
                s.completed_at = Some(Utc::now());
            });
            tracing::error!(
                recording_id = %recording_id,
                error = %message,
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Job failed"
            );
        }
    }
}

/// Download, transcode, and upload one recording, mapping each stage into
/// its progress band (0-20, 20-70, 70-100).
async fn process_one(
    inner: &Arc<QueueInner>,
    request: &ProcessingRequest,
    scratch: &Path,
) -> RecastResult<String> {
    tokio::fs::create_dir_all(scratch).await?;
    let source = scratch.join("source.mp4");
    let output = scratch.join("processed.mp4");

    bounded(
        inner.timeouts.download_secs,
        "Download",
        inner.store.download(&request.source_url, &source),
    )
    .await?;
    set_progress(inner, &request.recording_id, DOWNLOAD_DONE_PCT);

    let progress_inner = Arc::clone(inner);
    let progress_id = request.recording_id.clone();
    let on_progress: ProgressCallback = Box::new(move |fraction| {
        let pct = DOWNLOAD_DONE_PCT
            + fraction.clamp(0.0, 1.0) * (TRANSCODE_DONE_PCT - DOWNLOAD_DONE_PCT);
        set_progress(&progress_inner, &progress_id, pct);
    });
    inner
        .transcoder
        .transcode(&source, &output, request, on_progress)
        .await?;
    set_progress(inner, &request.recording_id, TRANSCODE_DONE_PCT);

    let key = format!("{}/{}.mp4", request.project_id, request.recording_id);
    let url = bounded(
        inner.timeouts.upload_secs,
        "Upload",
        inner.store.upload(&output, &key),
    )
    .await?;

    Ok(url)
}

/// Apply a bounded wait to a storage transfer.
async fn bounded<T>(
    budget_secs: u64,
    what: &str,
    fut: impl std::future::Future<Output = RecastResult<T>>,
) -> RecastResult<T> {
    match tokio::time::timeout(Duration::from_secs(budget_secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(RecastError::timeout(format!(
            "{what} exceeded {budget_secs}s budget"
        ))),
    }
}
