//! Bounded concurrent content fetch
//!
//! Every descriptor is attempted exactly once. A failed, empty or panicking
//! fetch drops that page and is logged; it never fails the batch.

use super::backend::CrawlBackend;
use super::job::{PageDescriptor, PageResult};
use scout_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

/// Pages whose content was retrieved, and the ones that were dropped
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub pages: Vec<PageResult>,
    pub dropped: Vec<DroppedPage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedPage {
    pub url: String,
    pub reason: String,
}

impl FetchOutcome {
    fn drop_page(&mut self, url: String, reason: impl Into<String>) {
        self.dropped.push(DroppedPage {
            url,
            reason: reason.into(),
        });
    }
}

pub async fn fetch_all(
    backend: Arc<dyn CrawlBackend>,
    pages: Vec<PageDescriptor>,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<FetchOutcome> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    let mut urls: HashMap<Id, String> = HashMap::with_capacity(pages.len());

    for page in pages {
        let backend = backend.clone();
        let semaphore = semaphore.clone();
        let url = page.url.clone();
        let handle = tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| Error::message(format!("fetch pool closed: {}", e)))?;
            let content = backend.retrieve(&page).await;
            Ok::<_, Error>((page, content))
        });
        urls.insert(handle.id(), url);
    }

    let mut outcome = FetchOutcome::default();
    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tasks.abort_all();
                tracing::info!(outstanding = tasks.len(), "Content fetch cancelled");
                return Err(Error::Cancelled);
            }
            joined = tasks.join_next_with_id() => joined,
        };

        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok((id, Ok((page, Ok(content))))) if !content.is_empty() => {
                urls.remove(&id);
                outcome.pages.push(PageResult {
                    url: page.url,
                    content,
                });
            }
            Ok((id, Ok((page, Ok(_))))) => {
                urls.remove(&id);
                tracing::debug!(url = %page.url, "Page returned no content, skipping");
                outcome.drop_page(page.url, "no content");
            }
            Ok((id, Ok((page, Err(e))))) => {
                urls.remove(&id);
                tracing::warn!(url = %page.url, error = %e, "Failed to retrieve page content");
                outcome.drop_page(page.url, e.to_string());
            }
            Ok((id, Err(e))) => {
                let url = urls.remove(&id).unwrap_or_default();
                tracing::warn!(url = %url, error = %e, "Fetch task could not start");
                outcome.drop_page(url, e.to_string());
            }
            Err(e) => {
                let url = urls.remove(&e.id()).unwrap_or_default();
                tracing::warn!(url = %url, error = %e, "Fetch task panicked or was aborted");
                outcome.drop_page(url, e.to_string());
            }
        }
    }

    Ok(outcome)
}
