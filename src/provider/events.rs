//! Progress events flowing from a provider back to the job that invoked it

use tokio::sync::mpsc;
use tracing::debug;

use crate::jobs::models::JobId;

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// Bytes received so far for the current item; `total_bytes` is `None`
    /// when the host never announced a size
    Progress {
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
    },
    /// One file finished downloading (a playlist produces many)
    ItemFinished { filename: Option<String> },
    /// One item failed but the provider carries on with the rest
    ItemFailed { reason: String },
    /// Non-fatal problem, e.g. a failed post-processing step
    Warning { message: String },
    /// The whole fetch is done
    Finished,
}

/// Per-job reporting capability handed to [`MediaProvider::fetch`].
///
/// Cloneable so a provider can report from helper tasks (e.g. a stderr
/// reader). Reports after the job side hung up are dropped.
///
/// [`MediaProvider::fetch`]: super::MediaProvider::fetch
#[derive(Debug, Clone)]
pub struct ProgressSink {
    job_id: JobId,
    tx: mpsc::UnboundedSender<ProviderEvent>,
}

impl ProgressSink {
    pub fn channel(job_id: impl Into<JobId>) -> (Self, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            job_id: job_id.into(),
            tx,
        };
        (sink, rx)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn report(&self, event: ProviderEvent) {
        if self.tx.send(event).is_err() {
            debug!(job_id = %self.job_id, "Progress receiver gone, dropping event");
        }
    }
}
