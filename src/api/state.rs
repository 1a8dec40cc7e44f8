use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobRunner;
use crate::observability::Metrics;
use crate::provider::MediaProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub runner: JobRunner,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn MediaProvider>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let runner = JobRunner::new(provider)
            .with_max_concurrent(config.jobs.max_concurrent)
            .with_metrics(metrics.clone());

        Self {
            config: Arc::new(config),
            runner,
            metrics,
        }
    }
}
