use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::events::ProgressSink;
use crate::jobs::models::{Job, JobId, JobKind};
use crate::jobs::quality::FormatSelector;

/// Everything a provider needs to run one job
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub job_id: JobId,
    pub url: String,
    pub kind: JobKind,
    pub selector: FormatSelector,
    pub output_dir: PathBuf,
}

impl FetchRequest {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            url: job.url.clone(),
            kind: job.kind,
            selector: FormatSelector::for_job(job.kind, &job.quality),
            output_dir: job.output_dir.clone(),
        }
    }
}

/// What a successful fetch produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSummary {
    pub items_finished: usize,
    /// Per-item failures the provider skipped over
    pub items_failed: Vec<String>,
    pub warnings: Vec<String>,
}

/// Metadata returned by a probe; nothing is downloaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    /// Seconds, when the host reports one
    pub duration: Option<u64>,
    pub uploader: String,
    /// Number of entries when the URL is a playlist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
}

/// External media extraction capability the job runner delegates to
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &'static str;

    /// Download the request's media, reporting progress into `sink`
    async fn fetch(&self, request: &FetchRequest, sink: ProgressSink) -> Result<FetchSummary>;

    /// Resolve title/duration/uploader without downloading
    async fn probe(&self, url: &str) -> Result<MediaInfo>;
}
