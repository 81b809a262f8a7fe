//! Crawl job and page types

use serde::Serialize;
use std::fmt;

/// Provider-reported job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Map a provider status string; unknown values count as still running.
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "completed" => JobStatus::Completed,
            "failed" | "error" | "cancelled" => JobStatus::Failed,
            "pending" | "queued" => JobStatus::Pending,
            _ => JobStatus::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One status observation of a remote job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    pub status: JobStatus,
    /// Provider error text, present on some failed jobs
    pub error: Option<String>,
}

impl JobState {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// A discovered page and the opaque handle used to fetch its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    pub url: String,
    pub retrieve_id: String,
}

impl PageDescriptor {
    pub fn new(url: impl Into<String>, retrieve_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retrieve_id: retrieve_id.into(),
        }
    }
}

/// Content fetched for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub url: String,
    pub content: String,
}

/// Stage of a crawl, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Created,
    Submitted,
    Polling,
    PagesListed,
    Fetching,
    Aggregated,
    Failed,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Created => "created",
            CrawlPhase::Submitted => "submitted",
            CrawlPhase::Polling => "polling",
            CrawlPhase::PagesListed => "pages_listed",
            CrawlPhase::Fetching => "fetching",
            CrawlPhase::Aggregated => "aggregated",
            CrawlPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
