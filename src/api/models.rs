//! Request and response bodies for the HTTP API.
//!
//! ```json
//! POST /downloads
//! { "url": "https://www.youtube.com/watch?v=...", "type": "audio", "quality": "128k" }
//! ```
//!
//! `type` and `kind` are accepted interchangeably. Job status bodies are
//! [`JobStatus`](crate::jobs::JobStatus) serialized as is.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
    /// `video`, `audio` or `playlist`; video when absent
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadAccepted {
    pub job_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub jobs: usize,
    pub metrics: MetricsSnapshot,
}
