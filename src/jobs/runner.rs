//! Job submission and execution.
//!
//! `submit` validates, records the job as `starting` and spawns one tokio task
//! per job. That task owns the job's [`JobTracker`] and is the only writer of
//! its registry entry.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{Job, JobId, JobState, JobStatus, SubmitRequest, UnknownKind};
use super::registry::JobRegistry;
use super::tracker::JobTracker;
use crate::observability::Metrics;
use crate::provider::{FetchRequest, MediaInfo, MediaProvider, ProgressSink, ProviderError};

pub const WAITING_MESSAGE: &str = "Waiting for a free download slot...";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error("no async runtime available to run the job")]
    NoRuntime,
}

#[derive(Clone)]
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    provider: Arc<dyn MediaProvider>,
    limiter: Option<Arc<Semaphore>>,
    metrics: Arc<Metrics>,
}

impl JobRunner {
    pub fn new(provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            provider,
            limiter: None,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Limit how many provider calls run at once; `0` means unbounded
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.limiter = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    /// Share an existing registry, e.g. with another runner or a test
    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Accept a job and start it in the background. Never waits on I/O.
    pub fn submit(&self, request: SubmitRequest) -> Result<JobId, SubmitError> {
        let url = request.url.trim();
        if url.is_empty() {
            self.metrics.job_rejected();
            return Err(SubmitError::EmptyUrl);
        }
        let runtime = Handle::try_current().map_err(|_| {
            self.metrics.job_rejected();
            SubmitError::NoRuntime
        })?;

        let job = Arc::new(Job {
            id: Uuid::now_v7().to_string(),
            url: url.to_string(),
            kind: request.kind,
            quality: request.quality,
            output_dir: request.output_dir,
            created_at: Utc::now(),
        });
        let tracker = JobTracker::start(job.clone(), self.registry.clone());
        self.metrics.job_submitted();

        info!(
            job_id = %job.id,
            kind = %job.kind,
            quality = %job.quality,
            url = %job.url,
            output_dir = %job.output_dir.display(),
            "Job submitted"
        );

        runtime.spawn(run_job(
            tracker,
            self.provider.clone(),
            self.limiter.clone(),
            self.metrics.clone(),
        ));

        Ok(job.id.clone())
    }

    pub fn status(&self, job_id: &str) -> JobStatus {
        self.registry.status(job_id)
    }

    /// Resolve metadata for `url` without downloading
    pub async fn probe(&self, url: &str) -> Result<MediaInfo, ProviderError> {
        let info = self.provider.probe(url.trim()).await?;
        debug!(url, title = %info.title, "Probe succeeded");
        Ok(info)
    }
}

async fn run_job(
    mut tracker: JobTracker,
    provider: Arc<dyn MediaProvider>,
    limiter: Option<Arc<Semaphore>>,
    metrics: Arc<Metrics>,
) {
    let _permit = match limiter {
        Some(limiter) => {
            tracker.note(WAITING_MESSAGE);
            match limiter.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracker.finish(Err(ProviderError::Failed("download slots closed".into())));
                    metrics.job_failed();
                    return;
                }
            }
        }
        None => None,
    };

    let job = tracker.job().clone();
    tracker.note(format!("Starting {} download...", job.kind));

    let request = FetchRequest::from_job(&job);
    let (sink, mut events) = ProgressSink::channel(job.id.clone());
    debug!(job_id = %job.id, provider = provider.name(), selector = %request.selector.format_spec(), "Invoking provider");

    let mut fetch = tokio::spawn(async move { provider.fetch(&request, sink).await });

    let outcome = loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => tracker.apply(event),
            joined = &mut fetch => {
                break joined.unwrap_or_else(|e| {
                    warn!(job_id = %job.id, error = %e, "Provider task aborted");
                    Err(ProviderError::Failed(format!("provider task aborted: {e}")))
                });
            }
        }
    };

    while let Ok(event) = events.try_recv() {
        tracker.apply(event);
    }
    tracker.finish(outcome);

    match tracker.current().state {
        JobState::Completed => metrics.job_completed(),
        JobState::Error => metrics.job_failed(),
        state => warn!(job_id = %job.id, ?state, "Job task ended in a non-terminal state"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::JobKind;
    use crate::provider::{FetchSummary, ProviderEvent, ScriptedProvider, Step};
    use std::path::PathBuf;
    use std::time::Duration;

    fn request(url: &str, kind: JobKind) -> SubmitRequest {
        SubmitRequest {
            url: url.to_string(),
            kind,
            quality: "720p".to_string(),
            output_dir: PathBuf::from("."),
        }
    }

    fn progress(downloaded: u64, total: Option<u64>) -> ProviderEvent {
        ProviderEvent::Progress {
            downloaded_bytes: downloaded,
            total_bytes: total,
        }
    }

    async fn wait_for(runner: &JobRunner, id: &str, check: impl Fn(&JobStatus) -> bool) -> JobStatus {
        for _ in 0..400 {
            let status = runner.status(id);
            if check(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached, last status: {:?}", runner.status(id));
    }

    #[tokio::test]
    async fn test_submit_returns_starting_immediately() {
        let provider = Arc::new(ScriptedProvider::new());
        let _handle = provider.live("https://example.com/v1");
        let runner = JobRunner::new(provider);

        let id = runner.submit(request("https://example.com/v1", JobKind::Video)).unwrap();
        let status = runner.status(&id);

        assert_eq!(status.state, JobState::Starting);
        assert_eq!(status.progress, 0.0);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_starting_message_names_kind() {
        let provider = Arc::new(ScriptedProvider::new());
        let _handle = provider.live("https://example.com/a1");
        let runner = JobRunner::new(provider);

        let id = runner.submit(request("https://example.com/a1", JobKind::Audio)).unwrap();
        let status = wait_for(&runner, &id, |s| s.message == "Starting audio download...").await;
        assert_eq!(status.state, JobState::Starting);
    }

    #[tokio::test]
    async fn test_progress_then_completion() {
        let provider = Arc::new(ScriptedProvider::new());
        let handle = provider.live("https://example.com/v1");
        let runner = JobRunner::new(provider);
        let id = runner.submit(request("https://example.com/v1", JobKind::Video)).unwrap();

        handle.emit(progress(50, Some(100)));
        let status = wait_for(&runner, &id, |s| s.state == JobState::Downloading).await;
        assert_eq!(status.progress, 50.0);
        assert_eq!(status.message, "Downloading... 50.0%");

        handle.emit(ProviderEvent::Finished);
        handle.succeed();
        let status = wait_for(&runner, &id, |s| s.is_terminal()).await;
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.progress, 100.0);
        assert_eq!(status.message, "Video download completed!");
    }

    #[tokio::test]
    async fn test_success_without_finished_event_completes() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script(
            "https://example.com/v2",
            vec![Step::Emit(progress(10, Some(20))), Step::Succeed(FetchSummary::default())],
        );
        let runner = JobRunner::new(provider);
        let id = runner.submit(request("https://example.com/v2", JobKind::Video)).unwrap();

        let status = wait_for(&runner, &id, |s| s.is_terminal()).await;
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.progress, 100.0);
    }

    #[tokio::test]
    async fn test_unknown_total_only_changes_message() {
        let provider = Arc::new(ScriptedProvider::new());
        let handle = provider.live("https://example.com/live");
        let runner = JobRunner::new(provider);
        let id = runner.submit(request("https://example.com/live", JobKind::Video)).unwrap();

        handle.emit(progress(2048, None));
        let status = wait_for(&runner, &id, |s| s.message == "Downloaded: 2048 bytes").await;
        assert_eq!(status.state, JobState::Downloading);
        assert_eq!(status.progress, 0.0);

        handle.emit(progress(4096, None));
        let status = wait_for(&runner, &id, |s| s.message == "Downloaded: 4096 bytes").await;
        assert_eq!(status.progress, 0.0);
        handle.succeed();
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let provider = Arc::new(ScriptedProvider::new());
        let handle = provider.live("https://example.com/merge");
        let runner = JobRunner::new(provider);
        let id = runner.submit(request("https://example.com/merge", JobKind::Video)).unwrap();

        handle.emit(progress(90, Some(100)));
        wait_for(&runner, &id, |s| s.progress == 90.0).await;
        handle.emit(progress(5, Some(100)));
        handle.emit(progress(1, Some(1000)));
        let status = wait_for(&runner, &id, |s| s.message == "Downloading... 90.0%").await;
        assert_eq!(status.progress, 90.0);
        handle.succeed();
    }

    #[tokio::test]
    async fn test_provider_failure_is_terminal_and_stable() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script(
            "https://example.com/missing",
            vec![
                Step::Emit(progress(10, Some(100))),
                Step::Fail("Unable to download webpage: HTTP Error 404: Not Found".into()),
            ],
        );
        let runner = JobRunner::new(provider);
        let id = runner
            .submit(request("https://example.com/missing", JobKind::Video))
            .unwrap();

        let first = wait_for(&runner, &id, |s| s.is_terminal()).await;
        assert_eq!(first.state, JobState::Error);
        assert_eq!(first.progress, 0.0);
        assert_eq!(
            first.error.as_deref(),
            Some("Unable to download webpage: HTTP Error 404: Not Found")
        );
        assert!(first.message.starts_with("Video download failed: "));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runner.status(&id), first);
    }

    #[tokio::test]
    async fn test_playlist_item_failure_still_completes() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script(
            "https://example.com/list",
            vec![
                Step::Emit(progress(100, Some(100))),
                Step::Emit(ProviderEvent::ItemFinished {
                    filename: Some("one.mp4".into()),
                }),
                Step::Emit(ProviderEvent::ItemFailed {
                    reason: "Video unavailable".into(),
                }),
                Step::Emit(progress(100, Some(100))),
                Step::Emit(ProviderEvent::Finished),
                Step::Succeed(FetchSummary {
                    items_finished: 2,
                    items_failed: vec!["Video unavailable".into()],
                    warnings: vec![],
                }),
            ],
        );
        let runner = JobRunner::new(provider);
        let id = runner
            .submit(request("https://example.com/list", JobKind::Playlist))
            .unwrap();

        let status = wait_for(&runner, &id, |s| s.is_terminal()).await;
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.message, "Playlist download completed!");
    }

    #[tokio::test]
    async fn test_warning_is_kept_on_completed_job() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script(
            "https://example.com/song",
            vec![
                Step::Emit(progress(100, Some(100))),
                Step::Emit(ProviderEvent::Warning {
                    message: "Postprocessing: ffprobe and ffmpeg not found".into(),
                }),
                Step::Succeed(FetchSummary::default()),
            ],
        );
        let runner = JobRunner::new(provider);
        let id = runner.submit(request("https://example.com/song", JobKind::Audio)).unwrap();

        let status = wait_for(&runner, &id, |s| s.is_terminal()).await;
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(
            status.warning.as_deref(),
            Some("Postprocessing: ffprobe and ffmpeg not found")
        );
    }

    #[tokio::test]
    async fn test_events_after_finished_are_ignored() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script(
            "https://example.com/late",
            vec![
                Step::Emit(ProviderEvent::Finished),
                Step::Emit(progress(1, Some(100))),
                Step::Fail("late failure".into()),
            ],
        );
        let runner = JobRunner::new(provider);
        let id = runner.submit(request("https://example.com/late", JobKind::Video)).unwrap();

        let status = wait_for(&runner, &id, |s| s.is_terminal()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(runner.status(&id).state, JobState::Completed);
        assert_eq!(runner.status(&id).progress, 100.0);
    }

    #[tokio::test]
    async fn test_concurrency_limit_queues_second_job() {
        let provider = Arc::new(ScriptedProvider::new());
        let first = provider.live("https://example.com/1");
        let second = provider.live("https://example.com/2");
        let runner = JobRunner::new(provider.clone()).with_max_concurrent(1);

        let id1 = runner.submit(request("https://example.com/1", JobKind::Video)).unwrap();
        first.emit(progress(1, Some(2)));
        wait_for(&runner, &id1, |s| s.state == JobState::Downloading).await;

        let id2 = runner.submit(request("https://example.com/2", JobKind::Video)).unwrap();
        let waiting = wait_for(&runner, &id2, |s| s.message == WAITING_MESSAGE).await;
        assert_eq!(waiting.state, JobState::Starting);
        assert_eq!(provider.fetch_count(), 1);

        first.succeed();
        wait_for(&runner, &id1, |s| s.is_terminal()).await;
        wait_for(&runner, &id2, |s| s.message == "Starting video download...").await;

        second.succeed();
        let done = wait_for(&runner, &id2, |s| s.is_terminal()).await;
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let metrics = Arc::new(Metrics::new());
        let runner = JobRunner::new(Arc::new(ScriptedProvider::new())).with_metrics(metrics.clone());

        let err = runner.submit(request("   ", JobKind::Video)).unwrap_err();
        assert!(matches!(err, SubmitError::EmptyUrl));
        assert!(runner.registry().is_empty());
        assert_eq!(metrics.snapshot().jobs_rejected, 1);
    }

    #[test]
    fn test_submit_outside_runtime() {
        let runner = JobRunner::new(Arc::new(ScriptedProvider::new()));
        let err = runner.submit(request("https://example.com/v1", JobKind::Video)).unwrap_err();
        assert!(matches!(err, SubmitError::NoRuntime));
    }

    #[tokio::test]
    async fn test_injected_registry_sees_jobs() {
        let registry = Arc::new(JobRegistry::new());
        let runner = JobRunner::new(Arc::new(ScriptedProvider::new())).with_registry(registry.clone());

        let id = runner.submit(request("https://example.com/v1", JobKind::Video)).unwrap();
        assert!(registry.get(&id).is_some());
        wait_for(&runner, &id, |s| s.is_terminal()).await;
        assert_eq!(registry.status(&id).state, JobState::Completed);
    }

    #[tokio::test]
    async fn test_unknown_id_returns_sentinel() {
        let runner = JobRunner::new(Arc::new(ScriptedProvider::new()));
        let status = runner.status("nope");
        assert_eq!(status.state, JobState::Unknown);
        assert_eq!(status.message, "Download not found");
        assert_eq!(status.progress, 0.0);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_metrics_follow_outcomes() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script("https://example.com/bad", vec![Step::Fail("boom".into())]);
        let metrics = Arc::new(Metrics::new());
        let runner = JobRunner::new(provider).with_metrics(metrics.clone());

        let ok = runner.submit(request("https://example.com/ok", JobKind::Video)).unwrap();
        let bad = runner.submit(request("https://example.com/bad", JobKind::Video)).unwrap();
        wait_for(&runner, &ok, |s| s.is_terminal()).await;
        wait_for(&runner, &bad, |s| s.is_terminal()).await;

        let snap = metrics.snapshot();
        assert_eq!(snap.jobs_submitted, 2);
        // counters are bumped right after the final status is published
        for _ in 0..100 {
            if metrics.snapshot().jobs_completed + metrics.snapshot().jobs_failed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.jobs_completed, 1);
        assert_eq!(snap.jobs_failed, 1);
    }

    #[tokio::test]
    async fn test_probe_delegates_to_provider() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.probe_result(
            "https://example.com/v1",
            Ok(MediaInfo {
                title: "Demo".into(),
                duration: Some(42),
                uploader: "someone".into(),
                entries: None,
            }),
        );
        provider.probe_result("https://example.com/gone", Err("Video unavailable".into()));
        let runner = JobRunner::new(provider);

        let info = runner.probe("https://example.com/v1").await.unwrap();
        assert_eq!(info.title, "Demo");
        assert_eq!(info.duration, Some(42));

        let err = runner.probe("https://example.com/gone").await.unwrap_err();
        assert_eq!(err.to_string(), "Video unavailable");
    }
}
