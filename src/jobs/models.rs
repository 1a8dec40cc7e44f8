//! Job and status records shared by the runner, the registry and the adapters.
//!
//! A [`Job`] is immutable once submitted. A [`JobStatus`] is a value: the
//! runner builds a fresh one for every transition and publishes it whole, so
//! pollers only ever see complete records.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type JobId = String;

/// Message carried by the sentinel status for ids the registry never saw
pub const NOT_FOUND_MESSAGE: &str = "Download not found";

/// What the caller wants out of the URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Video,
    Audio,
    Playlist,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Video => "video",
            JobKind::Audio => "audio",
            JobKind::Playlist => "playlist",
        }
    }

    /// Capitalized form used in user-facing status messages
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Video => "Video",
            JobKind::Audio => "Audio",
            JobKind::Playlist => "Playlist",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized job kind '{0}', expected video, audio or playlist")]
pub struct UnknownKind(pub String);

impl FromStr for JobKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(JobKind::Video),
            "audio" => Ok(JobKind::Audio),
            "playlist" => Ok(JobKind::Playlist),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Submission input, validated by the runner before a [`Job`] exists
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub url: String,
    pub kind: JobKind,
    pub quality: String,
    pub output_dir: PathBuf,
}

/// One accepted fetch request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub kind: JobKind,
    pub quality: String,
    pub output_dir: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Unknown,
    Starting,
    Downloading,
    Completed,
    Error,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Unknown => "unknown",
            JobState::Starting => "starting",
            JobState::Downloading => "downloading",
            JobState::Completed => "completed",
            JobState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a job, as returned to pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(rename = "status")]
    pub state: JobState,
    pub progress: f64,
    pub message: String,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    pub fn new(state: JobState, progress: f64, message: impl Into<String>) -> Self {
        Self {
            state,
            progress,
            message: message.into(),
            error: None,
            warning: None,
            updated_at: Utc::now(),
        }
    }

    pub fn starting(message: impl Into<String>) -> Self {
        Self::new(JobState::Starting, 0.0, message)
    }

    /// Sentinel returned for ids nobody submitted
    pub fn not_found() -> Self {
        Self::new(JobState::Unknown, 0.0, NOT_FOUND_MESSAGE)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
