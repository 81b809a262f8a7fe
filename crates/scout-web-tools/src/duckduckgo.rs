//! DuckDuckGo web search over the HTML results page
//!
//! No API key is needed. Result links on the HTML endpoint point at a
//! DuckDuckGo redirect (`/l/?uddg=<target>`); those are unwrapped to the
//! target URL.

use scout_core::{AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com/html/";
pub const TOOL_NAME: &str = "duckduckgo_search";

const SERVICE: &str = "duckduckgo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct DuckDuckGoClient {
    http: HttpClient,
    base_url: String,
}

impl DuckDuckGoClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self::new(ctx.http().clone(), ctx.endpoint(SERVICE, DEFAULT_BASE_URL))
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let page = self
            .http
            .send_checked(SERVICE, |c| c.post(&self.base_url).form(&[("q", query)]))
            .await?
            .text()
            .await?;

        let results = parse_results(&page, max_results)?;
        tracing::debug!(query, results = results.len(), "DuckDuckGo search finished");
        Ok(results)
    }
}

#[cfg(feature = "html")]
fn parse_results(page: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    use crate::html::{selector, text_of};
    use scraper::Html;

    let document = Html::parse_document(page);
    let block = selector("div.result")?;
    let title = selector("a.result__a")?;
    let snippet = selector(".result__snippet")?;

    let mut results = Vec::new();
    for result in document.select(&block) {
        if results.len() >= max_results {
            break;
        }
        if result.value().classes().any(|class| class == "result--ad") {
            continue;
        }
        let Some(anchor) = result.select(&title).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };

        results.push(SearchResult {
            title: text_of(anchor),
            href,
            body: result.select(&snippet).next().map(text_of).unwrap_or_default(),
        });
    }

    Ok(results)
}

#[cfg(not(feature = "html"))]
fn parse_results(_page: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
    Err(missing_html())
}

fn missing_html() -> Error {
    Error::MissingDependency {
        tool: TOOL_NAME.to_string(),
        dependency: "html".to_string(),
    }
}

/// Resolve a result link, following the `uddg` parameter of redirect links
fn unwrap_redirect(href: &str) -> Option<String> {
    let base = url::Url::parse("https://duckduckgo.com/").ok()?;
    let link = base.join(href).ok()?;

    if link.host_str().is_some_and(|host| host.ends_with("duckduckgo.com")) && link.path().starts_with("/l/") {
        return link
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }

    match link.scheme() {
        "http" | "https" => Some(link.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    10
}

/// `duckduckgo_search`
pub fn create_duckduckgo_tool(ctx: &AdapterContext) -> Result<Arc<dyn Tool>> {
    let client = DuckDuckGoClient::from_context(ctx);

    let tool = FunctionTool::builder()
        .name(TOOL_NAME)
        .description("Search the web with DuckDuckGo and return titles, links and snippets")
        .schema(
            ToolSchema::new()
                .property("query", "string", "The search query")
                .property_with_default("max_results", "integer", "Maximum number of results", json!(10))
                .required("query")
                .build(),
        )
        .capabilities(ToolCapabilities::new(ToolKind::Search).depends_on("html", cfg!(feature = "html")))
        .execute(move |_ctx, params| {
            let client = client.clone();
            async move {
                if !cfg!(feature = "html") {
                    return Err(missing_html());
                }
                let params: SearchParams = parse_params(params)?;
                require_non_empty("query", &params.query)?;
                let results = client.search(&params.query, params.max_results).await?;
                Ok(ToolResponse::new(json!({ "results": results })))
            }
        })
        .build()?;

    Ok(Arc::new(tool))
}
