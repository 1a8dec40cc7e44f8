use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::models::{Job, JobState, JobStatus};
use super::registry::JobRegistry;
use crate::humanize::ByteSize;
use crate::provider::{FetchSummary, ProviderError, ProviderEvent};

/// Applies provider events to one job's status.
///
/// Owned by the task running the job, which makes it the only writer of that
/// job's registry entry. Every change builds a new [`JobStatus`] and publishes
/// it whole.
///
/// Progress is one monotonic figure per job, not per item. A playlist whose
/// first item reaches 100% keeps reporting `Downloading... 100.0%` while the
/// remaining items transfer; completion is signalled by the state alone.
pub struct JobTracker {
    job: Arc<Job>,
    registry: Arc<JobRegistry>,
    current: JobStatus,
    warnings: Vec<String>,
    items_failed: usize,
    item_bytes: u64,
}

impl JobTracker {
    /// Publishes the initial `starting` status
    pub fn start(job: Arc<Job>, registry: Arc<JobRegistry>) -> Self {
        let current = JobStatus::starting("Initializing download...");
        registry.put(&job.id, current.clone());
        Self {
            job,
            registry,
            current,
            warnings: Vec::new(),
            items_failed: 0,
            item_bytes: 0,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn current(&self) -> &JobStatus {
        &self.current
    }

    /// Replace the message while the job has not started transferring
    pub fn note(&mut self, message: impl Into<String>) {
        if self.current.state != JobState::Starting {
            return;
        }
        let mut next = self.current.clone();
        next.message = message.into();
        self.publish(next);
    }

    pub fn apply(&mut self, event: ProviderEvent) {
        if self.current.is_terminal() {
            debug!(job_id = %self.job.id, ?event, "Ignoring event for finished job");
            return;
        }

        match event {
            ProviderEvent::Progress {
                downloaded_bytes,
                total_bytes,
            } => self.on_progress(downloaded_bytes, total_bytes),
            ProviderEvent::ItemFinished { filename } => {
                info!(
                    job_id = %self.job.id,
                    filename = filename.as_deref().unwrap_or("<unknown>"),
                    size = %ByteSize(self.item_bytes).to_progress_string(),
                    "Item downloaded"
                );
                self.item_bytes = 0;
            }
            ProviderEvent::ItemFailed { reason } => {
                self.items_failed += 1;
                warn!(job_id = %self.job.id, %reason, "Item failed, continuing");
            }
            ProviderEvent::Warning { message } => {
                warn!(job_id = %self.job.id, %message, "Provider warning");
                self.warnings.push(message);
                let mut next = self.current.clone();
                next.warning = self.warning_text();
                self.publish(next);
            }
            ProviderEvent::Finished => self.complete(),
        }
    }

    /// Record the provider's final outcome
    pub fn finish(&mut self, outcome: Result<FetchSummary, ProviderError>) {
        match outcome {
            Ok(summary) => {
                self.items_failed = self.items_failed.max(summary.items_failed.len());
                let known = self.warnings.len();
                for warning in summary.warnings {
                    if !self.warnings.contains(&warning) {
                        self.warnings.push(warning);
                    }
                }
                if !self.current.is_terminal() {
                    self.complete();
                } else if self.current.state == JobState::Completed && self.warnings.len() > known {
                    let mut next = self.current.clone();
                    next.warning = self.warning_text();
                    self.publish(next);
                }
                info!(
                    job_id = %self.job.id,
                    kind = %self.job.kind,
                    items_finished = summary.items_finished,
                    items_failed = self.items_failed,
                    "Job completed"
                );
            }
            Err(err) if self.current.is_terminal() => {
                warn!(job_id = %self.job.id, error = %err, "Provider failed after job reached a terminal state");
            }
            Err(err) => {
                let cause = err.to_string();
                warn!(job_id = %self.job.id, kind = %self.job.kind, error = %cause, "Job failed");
                let next = JobStatus {
                    state: JobState::Error,
                    progress: 0.0,
                    message: format!("{} download failed: {}", self.job.kind.label(), cause),
                    error: Some(cause),
                    warning: self.warning_text(),
                    updated_at: Utc::now(),
                };
                self.publish(next);
            }
        }
    }

    fn on_progress(&mut self, downloaded_bytes: u64, total_bytes: Option<u64>) {
        self.item_bytes = downloaded_bytes;
        let previous = self.current.progress;
        let next = match total_bytes.filter(|total| *total > 0) {
            Some(total) => {
                let percent = (downloaded_bytes as f64 / total as f64 * 100.0).min(100.0);
                let progress = percent.max(previous);
                JobStatus {
                    state: JobState::Downloading,
                    progress,
                    message: format!("Downloading... {progress:.1}%"),
                    error: None,
                    warning: self.warning_text(),
                    updated_at: Utc::now(),
                }
            }
            None => JobStatus {
                state: JobState::Downloading,
                progress: previous,
                message: format!("Downloaded: {downloaded_bytes} bytes"),
                error: None,
                warning: self.warning_text(),
                updated_at: Utc::now(),
            },
        };
        self.publish(next);
    }

    fn complete(&mut self) {
        let message = format!("{} download completed!", self.job.kind.label());
        if self.items_failed > 0 {
            warn!(job_id = %self.job.id, skipped = self.items_failed, "Job completed with skipped items");
        }
        if let Some(warning) = self.warnings.last() {
            warn!(job_id = %self.job.id, %warning, "Job completed with warnings");
        }
        let next = JobStatus {
            state: JobState::Completed,
            progress: 100.0,
            message,
            error: None,
            warning: self.warning_text(),
            updated_at: Utc::now(),
        };
        self.publish(next);
    }

    fn warning_text(&self) -> Option<String> {
        if self.warnings.is_empty() {
            None
        } else {
            Some(self.warnings.join("; "))
        }
    }

    fn publish(&mut self, mut next: JobStatus) {
        next.updated_at = Utc::now();
        self.registry.put(&self.job.id, next.clone());
        self.current = next;
    }
}
