//! Wikipedia search and article summaries via the MediaWiki API

use scout_core::{AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org/w/api.php";

const SERVICE: &str = "wikipedia";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: ExtractQuery,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    title: String,
    #[serde(default)]
    missing: bool,
    extract: Option<String>,
}

/// Introductory summary of an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct WikipediaClient {
    http: HttpClient,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self::new(ctx.http().clone(), ctx.endpoint(SERVICE, DEFAULT_BASE_URL))
    }

    /// Titles of matching articles, best match first
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<String>> {
        let limit = limit.to_string();
        let response: SearchResponse = self
            .http
            .json(SERVICE, |c| {
                c.get(&self.base_url).query(&[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", query),
                    ("srlimit", limit.as_str()),
                    ("srprop", ""),
                    ("format", "json"),
                    ("formatversion", "2"),
                ])
            })
            .await?;

        Ok(response.query.search.into_iter().map(|hit| hit.title).collect())
    }

    /// Summary for `query` read as a title, falling back to the top search hit
    pub async fn summary(&self, query: &str) -> Result<Summary> {
        if let Some(summary) = self.extract(query).await? {
            return Ok(summary);
        }

        let best = self
            .search(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no Wikipedia page matches '{}'", query)))?;
        tracing::debug!(query, resolved = %best, "Resolved Wikipedia title via search");

        self.extract(&best)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Wikipedia page '{}' has no summary", best)))
    }

    async fn extract(&self, title: &str) -> Result<Option<Summary>> {
        let response: ExtractResponse = self
            .http
            .json(SERVICE, |c| {
                c.get(&self.base_url).query(&[
                    ("action", "query"),
                    ("prop", "extracts"),
                    ("exintro", "1"),
                    ("explaintext", "1"),
                    ("redirects", "1"),
                    ("titles", title),
                    ("format", "json"),
                    ("formatversion", "2"),
                ])
            })
            .await?;

        Ok(response
            .query
            .pages
            .into_iter()
            .find(|page| !page.missing)
            .and_then(|page| {
                let summary = page.extract.filter(|text| !text.trim().is_empty())?;
                Some(Summary {
                    title: page.title,
                    summary,
                })
            }))
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
struct SummaryParams {
    query: String,
}

/// `wikipedia_search` and `wikipedia_summary`
pub fn create_wikipedia_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    let client = WikipediaClient::from_context(ctx);

    let search = {
        let client = client.clone();
        FunctionTool::builder()
            .name("wikipedia_search")
            .description("Search Wikipedia and return the titles of matching articles")
            .schema(
                ToolSchema::new()
                    .property("query", "string", "The search query")
                    .property_with_default("limit", "integer", "Maximum number of titles", json!(10))
                    .required("query")
                    .build(),
            )
            .capabilities(ToolCapabilities::new(ToolKind::Search))
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: SearchParams = parse_params(params)?;
                    require_non_empty("query", &params.query)?;
                    let titles = client.search(&params.query, params.limit).await?;
                    Ok(ToolResponse::new(json!({ "titles": titles })))
                }
            })
            .build()?
    };

    let summary = FunctionTool::builder()
        .name("wikipedia_summary")
        .description("Return the introductory summary of the Wikipedia article that best matches a query")
        .schema(
            ToolSchema::new()
                .property("query", "string", "Article title or search query")
                .required("query")
                .build(),
        )
        .capabilities(ToolCapabilities::new(ToolKind::Search))
        .execute(move |_ctx, params| {
            let client = client.clone();
            async move {
                let params: SummaryParams = parse_params(params)?;
                require_non_empty("query", &params.query)?;
                let summary = client.summary(&params.query).await?;
                ToolResponse::from_serializable(&summary)
            }
        })
        .build()?;

    Ok(vec![Arc::new(search), Arc::new(summary)])
}
