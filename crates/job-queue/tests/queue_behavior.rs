//! End-to-end queue behavior against a filesystem store and a stub
//! transcoder: dedup, terminal snapshots, scratch cleanup, and retry on
//! resubmission.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use recast_common::{RecastError, RecastResult, TimeoutConfig};
use recast_job_queue::{FsStore, ProcessingQueue, SubmitOutcome, Transcoder};
use recast_recording_model::{CursorSample, JobStatus, ProcessingRequest};
use recast_render_engine::ProgressCallback;

/// Copies input to output after a short delay; counts invocations and can
/// be told to fail the first N calls.
struct StubTranscoder {
    calls: AtomicUsize,
    fail_first: usize,
    delay: Duration,
}

impl StubTranscoder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            delay: Duration::from_millis(50),
        }
    }

    fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::new()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        _request: &ProcessingRequest,
        on_progress: ProgressCallback,
    ) -> RecastResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if call < self.fail_first {
            return Err(RecastError::transcode("stub transcoder failure"));
        }
        on_progress(0.5);
        tokio::fs::copy(input, output).await?;
        on_progress(1.0);
        Ok(())
    }
}

struct Harness {
    queue: ProcessingQueue,
    transcoder: Arc<StubTranscoder>,
    scratch: tempfile::TempDir,
    store_root: tempfile::TempDir,
    source: std::path::PathBuf,
}

async fn harness(transcoder: StubTranscoder) -> Harness {
    let scratch = tempfile::tempdir().unwrap();
    let store_root = tempfile::tempdir().unwrap();

    let source = store_root.path().join("raw.mp4");
    tokio::fs::write(&source, b"raw recording bytes").await.unwrap();

    let transcoder = Arc::new(transcoder);
    let queue = ProcessingQueue::new(
        scratch.path(),
        TimeoutConfig::default(),
        Arc::new(FsStore::new(store_root.path())),
        Arc::clone(&transcoder) as Arc<dyn Transcoder>,
    );

    Harness {
        queue,
        transcoder,
        scratch,
        store_root,
        source,
    }
}

fn request(h: &Harness, recording_id: &str) -> ProcessingRequest {
    ProcessingRequest {
        recording_id: recording_id.to_string(),
        source_url: format!("file://{}", h.source.display()),
        cursor_samples: vec![
            CursorSample::moved(0.0, 100.0, 100.0),
            CursorSample::clicked(500.0, 200.0, 150.0),
        ],
        zoom_windows: Vec::new(),
        cursor_style: "normal".to_string(),
        project_id: "proj-1".to_string(),
    }
}

#[tokio::test]
async fn test_duplicate_submission_runs_one_transcode() {
    let h = harness(StubTranscoder::new()).await;

    assert_eq!(h.queue.submit(request(&h, "rec-a")), SubmitOutcome::Pending);
    assert_eq!(h.queue.submit(request(&h, "rec-a")), SubmitOutcome::Pending);

    let first = h.queue.wait("rec-a").await.unwrap();
    let second = h.queue.wait("rec-a").await.unwrap();

    assert_eq!(h.transcoder.call_count(), 1);
    assert_eq!(first.status, JobStatus::Complete);
    assert_eq!(first.result_url, second.result_url);
    assert_eq!(first.progress_percent, 100);
    assert!(first.started_at.is_some());
    assert!(first.completed_at.is_some());
}

#[tokio::test]
async fn test_resubmit_after_completion_returns_result_immediately() {
    let h = harness(StubTranscoder::new()).await;

    h.queue.submit(request(&h, "rec-b"));
    let done = h.queue.wait("rec-b").await.unwrap();
    let url = done.result_url.expect("complete job should carry a url");

    match h.queue.submit(request(&h, "rec-b")) {
        SubmitOutcome::Completed(cached) => assert_eq!(cached, url),
        SubmitOutcome::Pending => panic!("completed job should not re-run"),
    }
    assert_eq!(h.transcoder.call_count(), 1);
}

#[tokio::test]
async fn test_result_lands_under_project_key() {
    let h = harness(StubTranscoder::new()).await;

    h.queue.submit(request(&h, "rec-c"));
    let done = h.queue.wait("rec-c").await.unwrap();

    let expected = h.store_root.path().join("proj-1").join("rec-c.mp4");
    assert_eq!(
        done.result_url.as_deref(),
        Some(format!("file://{}", expected.display()).as_str())
    );
    assert_eq!(
        tokio::fs::read(&expected).await.unwrap(),
        b"raw recording bytes"
    );
}

#[tokio::test]
async fn test_scratch_removed_after_success() {
    let h = harness(StubTranscoder::new()).await;

    h.queue.submit(request(&h, "rec-d"));
    h.queue.wait("rec-d").await.unwrap();

    assert!(!h.scratch.path().join("rec-d").exists());
}

#[tokio::test]
async fn test_scratch_removed_and_error_recorded_after_failure() {
    let h = harness(StubTranscoder::failing_first(1)).await;

    h.queue.submit(request(&h, "rec-e"));
    let done = h.queue.wait("rec-e").await.unwrap();

    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.result_url.is_none());
    assert!(done.error.as_deref().unwrap().contains("stub transcoder failure"));
    assert!(!h.scratch.path().join("rec-e").exists());
}

#[tokio::test]
async fn test_failed_job_retries_on_resubmission() {
    let h = harness(StubTranscoder::failing_first(1)).await;

    h.queue.submit(request(&h, "rec-f"));
    let failed = h.queue.wait("rec-f").await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);

    assert_eq!(h.queue.submit(request(&h, "rec-f")), SubmitOutcome::Pending);
    let retried = h.queue.wait("rec-f").await.unwrap();

    assert_eq!(retried.status, JobStatus::Complete);
    assert!(retried.result_url.is_some());
    assert_eq!(h.transcoder.call_count(), 2);
}

#[tokio::test]
async fn test_missing_source_fails_the_job() {
    let h = harness(StubTranscoder::new()).await;

    let mut req = request(&h, "rec-g");
    req.source_url = format!("file://{}", h.store_root.path().join("absent.mp4").display());
    h.queue.submit(req);

    let done = h.queue.wait("rec-g").await.unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(h.transcoder.call_count(), 0);
    assert!(!h.scratch.path().join("rec-g").exists());
}

#[tokio::test]
async fn test_unknown_recording_id() {
    let h = harness(StubTranscoder::new()).await;

    assert!(h.queue.get_status("never-submitted").is_none());
    assert!(h.queue.wait("never-submitted").await.is_err());
}
