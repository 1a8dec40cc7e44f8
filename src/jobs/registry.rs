use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use super::models::{JobId, JobStatus};

/// Process-wide map from job id to the latest published status.
///
/// Records are immutable `Arc<JobStatus>` values. Writers swap a whole record
/// in under a short write lock and readers clone the `Arc`, so a poll can
/// never observe a half-applied update. Entries are never evicted; the map
/// grows for the lifetime of the process.
#[derive(Debug, Default)]
pub struct JobRegistry {
    entries: RwLock<HashMap<JobId, Arc<JobStatus>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the status for `id` (last write wins)
    pub fn put(&self, id: &str, status: JobStatus) {
        trace!(job_id = id, state = ?status.state, progress = status.progress, "Publishing status");
        let record = Arc::new(status);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), record);
    }

    /// Snapshot of the status for `id`, if the job exists
    pub fn get(&self, id: &str) -> Option<Arc<JobStatus>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Status for `id`, or the "unknown" sentinel. Never fails.
    pub fn status(&self, id: &str) -> JobStatus {
        self.get(id)
            .map(|record| record.as_ref().clone())
            .unwrap_or_else(JobStatus::not_found)
    }

    /// Snapshot of every job the process has seen
    pub fn list(&self) -> BTreeMap<JobId, JobStatus> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, record)| (id.clone(), record.as_ref().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
