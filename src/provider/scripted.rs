//! Deterministic in-process provider for tests and offline development.
//!
//! Each URL can be given either a fixed script, played back as soon as the
//! job starts, or a live [`ScriptHandle`] the caller feeds one step at a time
//! so intermediate states can be observed. URLs without a script finish
//! immediately with an empty summary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::{ProviderError, Result};
use super::events::{ProgressSink, ProviderEvent};
use super::traits::{FetchRequest, FetchSummary, MediaInfo, MediaProvider};

#[derive(Debug, Clone)]
pub enum Step {
    Emit(ProviderEvent),
    Succeed(FetchSummary),
    Fail(String),
}

enum Script {
    Fixed(Vec<Step>),
    Live(mpsc::UnboundedReceiver<Step>),
}

/// Sending half of a live script
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    tx: mpsc::UnboundedSender<Step>,
}

impl ScriptHandle {
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.tx.send(Step::Emit(event));
    }

    pub fn succeed(&self) {
        let _ = self.tx.send(Step::Succeed(FetchSummary::default()));
    }

    pub fn succeed_with(&self, summary: FetchSummary) {
        let _ = self.tx.send(Step::Succeed(summary));
    }

    pub fn fail(&self, message: impl Into<String>) {
        let _ = self.tx.send(Step::Fail(message.into()));
    }
}

#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, Script>>,
    probes: Mutex<HashMap<String, std::result::Result<MediaInfo, String>>>,
    fetches: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play `steps` back for the next fetch of `url`
    pub fn script(&self, url: impl Into<String>, steps: Vec<Step>) {
        self.lock_scripts().insert(url.into(), Script::Fixed(steps));
    }

    /// Drive the next fetch of `url` step by step through the returned handle
    pub fn live(&self, url: impl Into<String>) -> ScriptHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_scripts().insert(url.into(), Script::Live(rx));
        ScriptHandle { tx }
    }

    pub fn probe_result(&self, url: impl Into<String>, result: std::result::Result<MediaInfo, String>) {
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), result);
    }

    /// Number of fetches started so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn lock_scripts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Script>> {
        self.scripts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MediaProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch(&self, request: &FetchRequest, sink: ProgressSink) -> Result<FetchSummary> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let script = self.lock_scripts().remove(&request.url);

        match script {
            None => Ok(FetchSummary::default()),
            Some(Script::Fixed(steps)) => {
                for step in steps {
                    if let Some(outcome) = play(step, &sink) {
                        return outcome;
                    }
                    tokio::task::yield_now().await;
                }
                Ok(FetchSummary::default())
            }
            Some(Script::Live(mut rx)) => {
                while let Some(step) = rx.recv().await {
                    if let Some(outcome) = play(step, &sink) {
                        return outcome;
                    }
                }
                Err(ProviderError::Failed("script ended without an outcome".into()))
            }
        }
    }

    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let result = self
            .probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned();

        match result {
            Some(Ok(info)) => Ok(info),
            Some(Err(message)) => Err(ProviderError::Failed(message)),
            None => Ok(MediaInfo {
                title: "Unknown".to_string(),
                duration: None,
                uploader: "Unknown".to_string(),
                entries: None,
            }),
        }
    }
}

fn play(step: Step, sink: &ProgressSink) -> Option<Result<FetchSummary>> {
    match step {
        Step::Emit(event) => {
            sink.report(event);
            None
        }
        Step::Succeed(summary) => Some(Ok(summary)),
        Step::Fail(message) => Some(Err(ProviderError::Failed(message))),
    }
}
