//! Web search, scrape and crawl tools for Scout
//!
//! This crate provides tool adapters over third-party web services:
//!
//! ## Search
//! - **Wikipedia**: article search and summaries (no API key)
//! - **DuckDuckGo**: HTML results page (no API key, `html` feature)
//! - **Serper**: Google web and news search (`SERPER_API_KEY`)
//! - **Olostep / Firecrawl**: search through the scraping providers
//! - **YouTube search**: video results via Serper
//!
//! ## Scrape and crawl
//! - **Olostep / Firecrawl**: single-page scrapes and site crawls
//! - **Simple crawl**: local single-page fetch and markdown conversion (`html` feature)
//!
//! The Olostep crawl runs the [`crawl`] workflow: submit, poll, list pages,
//! fetch content with a bounded worker pool, aggregate in URL order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use scout_core::{AdapterContext, ScoutConfig};
//! use scout_web_tools::create_web_tools;
//!
//! # fn main() -> scout_core::Result<()> {
//! let ctx = AdapterContext::from_config(ScoutConfig::load_or_default()?)?;
//! for tool in create_web_tools(&ctx)? {
//!     println!("{}: {}", tool.name(), tool.description());
//! }
//! # Ok(())
//! # }
//! ```

pub mod crawl;
pub mod duckduckgo;
pub mod firecrawl;
pub mod olostep;
pub mod serper;
pub mod simple_crawl;
pub mod wikipedia;
pub mod youtube_search;

#[cfg(feature = "html")]
mod html;

pub use crawl::{CrawlBackend, CrawlConfig, CrawlOrchestrator, CrawlReport};
pub use duckduckgo::{create_duckduckgo_tool, DuckDuckGoClient};
pub use firecrawl::{create_firecrawl_tools, FirecrawlClient};
pub use olostep::{create_olostep_tools, OlostepClient, OlostepCrawlTool};
pub use serper::{create_serper_tools, SearchType, SerperClient, SerperQuery};
pub use simple_crawl::SimpleCrawlTool;
pub use wikipedia::{create_wikipedia_tools, WikipediaClient};
pub use youtube_search::create_youtube_search_tool;

use scout_core::{AdapterContext, Result, Tool};
use std::sync::Arc;

/// Every search, scrape and crawl tool in this crate.
///
/// Tools whose build feature is disabled are still listed; their
/// capabilities report the missing dependency.
pub fn create_web_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools = create_wikipedia_tools(ctx)?;
    tools.push(create_duckduckgo_tool(ctx)?);
    tools.extend(create_serper_tools(ctx)?);
    tools.push(create_youtube_search_tool(ctx)?);
    tools.extend(create_olostep_tools(ctx)?);
    tools.extend(create_firecrawl_tools(ctx)?);
    tools.push(Arc::new(SimpleCrawlTool::from_context(ctx)));
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::{CredentialResolver, ScoutConfig, ToolKind};
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_create_web_tools_names_are_unique() {
        let resolver = CredentialResolver::new()
            .with_env(HashMap::new())
            .with_search_depth(0);
        let ctx = AdapterContext::new(ScoutConfig::default(), resolver).unwrap();

        let tools = create_web_tools(&ctx).unwrap();
        let names: HashSet<_> = tools.iter().map(|t| t.name().to_string()).collect();

        assert_eq!(names.len(), tools.len());
        for expected in [
            "wikipedia_search",
            "wikipedia_summary",
            "duckduckgo_search",
            "serper_search",
            "youtube_search",
            "olostep_scrape_website",
            "olostep_web_search",
            "olostep_crawl_website",
            "firecrawl_search",
            "firecrawl_scrape_website",
            "firecrawl_crawl_website",
            "simple_crawl",
        ] {
            assert!(names.contains(expected), "missing {expected}");
        }

        let crawl = tools
            .iter()
            .find(|t| t.name() == "olostep_crawl_website")
            .unwrap();
        assert!(crawl.is_long_running());
        assert_eq!(crawl.capabilities().kind, ToolKind::Scrape);
    }
}
