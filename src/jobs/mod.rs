//! Download jobs: records, the in-memory registry and the runner that drives
//! providers.

pub mod models;
pub mod quality;
pub mod registry;
pub mod runner;
pub mod tracker;

pub use models::{Job, JobId, JobKind, JobState, JobStatus, SubmitRequest, UnknownKind};
pub use quality::{FormatSelector, quality_labels};
pub use registry::JobRegistry;
pub use runner::{JobRunner, SubmitError};
pub use tracker::JobTracker;
