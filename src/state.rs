//! Application state management

use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::config::Config;
use crate::engine::EngineLauncher;
use crate::pipeline::PdfPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pipeline: PdfPipeline,
    jobs: Semaphore,
}

impl AppState {
    /// Create a new application state around an engine launcher
    pub fn new(config: Config, launcher: Arc<dyn EngineLauncher>) -> Self {
        let pipeline = PdfPipeline::new(&config, launcher);
        let jobs = Semaphore::new(config.server.max_concurrent_jobs.max(1));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                jobs,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the generation pipeline
    pub fn pipeline(&self) -> &PdfPipeline {
        &self.inner.pipeline
    }

    /// Wait for a free generation slot; each slot owns one browser
    pub async fn acquire_job(&self) -> Option<SemaphorePermit<'_>> {
        self.inner.jobs.acquire().await.ok()
    }

    /// Generation slots currently free
    pub fn available_jobs(&self) -> usize {
        self.inner.jobs.available_permits()
    }
}
