use super::job::{JobState, PageDescriptor};
use async_trait::async_trait;
use scout_core::Result;

/// Remote crawl job API: submit, status, page listing and per-page retrieval
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrawlBackend: Send + Sync {
    /// Start a crawl and return the provider's job id
    async fn submit(&self, start_url: &str, max_pages: u32) -> Result<String>;

    async fn status(&self, job_id: &str) -> Result<JobState>;

    async fn list_pages(&self, job_id: &str) -> Result<Vec<PageDescriptor>>;

    /// Markdown content of one page; may be empty
    async fn retrieve(&self, page: &PageDescriptor) -> Result<String>;
}
