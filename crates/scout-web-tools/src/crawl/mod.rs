//! Website crawling against a remote crawl-job API
//!
//! A crawl submits a job, polls it until terminal, lists the discovered pages,
//! fetches their content through a bounded worker pool and joins the results
//! in URL order:
//!
//! ```text
//! Created → Submitted → Polling → PagesListed → Fetching → Aggregated
//!                          ↘ Failed
//! ```

mod aggregate;
mod backend;
mod job;
mod poller;
mod pool;

pub use aggregate::aggregate;
pub use backend::CrawlBackend;
pub use job::{CrawlPhase, JobState, JobStatus, PageDescriptor, PageResult};
pub use poller::{PollOutcome, Poller};
pub use pool::{fetch_all, DroppedPage, FetchOutcome};

use scout_core::{CrawlSettings, Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timing and fan-out for one orchestrator
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub fetch_workers: usize,
    pub default_max_pages: u32,
}

impl CrawlConfig {
    /// Defaults for everything except the upper bound on waiting
    pub fn new(max_wait: Duration) -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait,
            fetch_workers: 10,
            default_max_pages: 50,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fetch_workers(mut self, workers: usize) -> Self {
        self.fetch_workers = workers;
        self
    }

    pub fn poller(&self) -> Poller {
        Poller::new(self.poll_interval, self.max_wait)
    }
}

impl From<&CrawlSettings> for CrawlConfig {
    fn from(settings: &CrawlSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            max_wait: settings.max_wait(),
            fetch_workers: settings.fetch_workers,
            default_max_pages: settings.default_max_pages,
        }
    }
}

/// Outcome of a finished crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub job_id: String,
    pub pages_discovered: usize,
    pub pages_retrieved: usize,
    pub content: String,
}

/// Drives a [`CrawlBackend`] through the whole crawl workflow
#[derive(Clone)]
pub struct CrawlOrchestrator {
    backend: Arc<dyn CrawlBackend>,
    config: CrawlConfig,
}

impl std::fmt::Debug for CrawlOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CrawlOrchestrator {
    pub fn new(backend: Arc<dyn CrawlBackend>, config: CrawlConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub async fn crawl(
        &self,
        start_url: &str,
        max_pages: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<CrawlReport> {
        validate_start_url(start_url)?;
        let max_pages = max_pages.unwrap_or(self.config.default_max_pages);
        if max_pages == 0 {
            return Err(Error::invalid_params("max_pages must be a positive integer"));
        }
        tracing::info!(phase = %CrawlPhase::Created, start_url, max_pages, "Starting crawl");

        let job_id = self.backend.submit(start_url, max_pages).await?;
        tracing::info!(phase = %CrawlPhase::Submitted, job_id = %job_id, "Crawl job submitted");

        tracing::info!(phase = %CrawlPhase::Polling, job_id = %job_id, "Waiting for crawl job");
        let backend = self.backend.clone();
        let polled = self
            .config
            .poller()
            .poll(&job_id, cancel, || {
                let backend = backend.clone();
                let job_id = job_id.clone();
                async move {
                    let state = backend.status(&job_id).await?;
                    Ok(match state.status {
                        JobStatus::Completed => PollOutcome::Done(()),
                        JobStatus::Failed => PollOutcome::Failed(
                            state.error.unwrap_or_else(|| "Unknown error".to_string()),
                        ),
                        JobStatus::Pending | JobStatus::Running => PollOutcome::Pending,
                    })
                }
            })
            .await;

        if let Err(e) = polled {
            tracing::info!(phase = %CrawlPhase::Failed, job_id = %job_id, error = %e, "Crawl did not complete");
            return Err(e);
        }

        let pages = self.backend.list_pages(&job_id).await?;
        let pages_discovered = pages.len();
        tracing::info!(
            phase = %CrawlPhase::PagesListed,
            job_id = %job_id,
            pages = pages_discovered,
            "Crawled pages listed"
        );

        tracing::info!(
            phase = %CrawlPhase::Fetching,
            job_id = %job_id,
            workers = self.config.fetch_workers,
            "Retrieving page content"
        );
        let fetched = fetch_all(
            self.backend.clone(),
            pages,
            self.config.fetch_workers,
            cancel,
        )
        .await?;
        let pages_retrieved = fetched.pages.len();
        if !fetched.dropped.is_empty() {
            tracing::warn!(
                job_id = %job_id,
                dropped = fetched.dropped.len(),
                "Some crawled pages were dropped"
            );
        }

        let content = aggregate(fetched.pages);
        tracing::info!(
            phase = %CrawlPhase::Aggregated,
            job_id = %job_id,
            pages_retrieved,
            bytes = content.len(),
            "Crawl finished"
        );

        Ok(CrawlReport {
            job_id,
            pages_discovered,
            pages_retrieved,
            content,
        })
    }
}

fn validate_start_url(start_url: &str) -> Result<()> {
    if start_url.trim().is_empty() {
        return Err(Error::invalid_params("start_url must not be empty"));
    }
    url::Url::parse(start_url)
        .map_err(|e| Error::invalid_params(format!("Invalid URL '{}': {}", start_url, e)))?;
    Ok(())
}
