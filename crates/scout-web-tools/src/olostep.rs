//! Olostep scrape, SERP and crawl API
//!
//! All calls authenticate with `Authorization: Bearer <OLOSTEP_API_KEY>`.

use crate::crawl::{
    CrawlBackend, CrawlConfig, CrawlOrchestrator, JobState, JobStatus, PageDescriptor,
};
use async_trait::async_trait;
use scout_core::{
    AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolContext, ToolKind,
    ToolResponse,
};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "https://api.olostep.com/v1";
pub const API_KEY_VAR: &str = "OLOSTEP_API_KEY";

const SERVICE: &str = "olostep";
const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search";
const GOOGLE_SEARCH_PARSER: &str = "@olostep/google-search";
const MARKDOWN_FORMATS: &str = r#"["markdown"]"#;

#[derive(Debug, Clone)]
pub struct OlostepClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl OlostepClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Client for `tool`, resolving the API key through the context
    pub fn from_context(ctx: &AdapterContext, tool: &str) -> Result<Self> {
        Ok(Self::new(
            ctx.http().clone(),
            ctx.endpoint(SERVICE, DEFAULT_BASE_URL),
            ctx.credential(tool, API_KEY_VAR)?,
        ))
    }

    /// Abort in-flight requests and retry backoff once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.http = self.http.with_cancellation(token);
        self
    }

    /// Scrape one page and return its markdown (empty when the provider has none)
    pub async fn scrape(
        &self,
        url: &str,
        wait_before_scraping: u64,
        country: Option<&str>,
    ) -> Result<String> {
        let mut payload = json!({
            "url_to_scrape": url,
            "wait_before_scraping": wait_before_scraping,
            "formats": ["markdown"],
        });
        if let Some(country) = country {
            payload["country"] = json!(country);
        }

        tracing::debug!(url, "Scraping page via Olostep");
        let body: Value = self
            .http
            .json(SERVICE, |c| {
                c.post(format!("{}/scrapes", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&payload)
            })
            .await?;

        Ok(body["result"]["markdown_content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Google results parsed by Olostep; the raw response when no parsed content is present
    pub async fn web_search(&self, query: &str, country: &str, language: &str) -> Result<Value> {
        let search_url = url::Url::parse_with_params(
            GOOGLE_SEARCH_URL,
            &[("q", query), ("gl", country), ("hl", language)],
        )
        .map_err(|e| Error::invalid_params(format!("Cannot build search URL: {}", e)))?;

        let payload = json!({
            "formats": ["parser_extract"],
            "parser_extract": { "parser_id": GOOGLE_SEARCH_PARSER },
            "url_to_scrape": search_url.as_str(),
        });

        let body: Value = self
            .http
            .json(SERVICE, |c| {
                c.post(format!("{}/scrapes", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&payload)
            })
            .await?;

        match body["result"]["json_content"].as_str() {
            Some(content) => serde_json::from_str(content).map_err(|e| {
                Error::protocol(SERVICE, format!("json_content is not valid JSON: {}", e))
            }),
            None => Ok(body),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CrawlCreated {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlInfo {
    status: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlPages {
    #[serde(default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    url: Option<String>,
    retrieve_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Retrieved {
    markdown_content: Option<String>,
}

#[async_trait]
impl CrawlBackend for OlostepClient {
    async fn submit(&self, start_url: &str, max_pages: u32) -> Result<String> {
        let payload = json!({ "start_url": start_url, "max_pages": max_pages });
        let created: CrawlCreated = self
            .http
            .json(SERVICE, |c| {
                c.post(format!("{}/crawls", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&payload)
            })
            .await?;

        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::protocol(SERVICE, "crawl response has no id"))
    }

    async fn status(&self, job_id: &str) -> Result<JobState> {
        let info: CrawlInfo = self
            .http
            .json(SERVICE, |c| {
                c.get(format!("{}/crawls/{}", self.base_url, job_id))
                    .bearer_auth(&self.api_key)
            })
            .await?;

        let status = info
            .status
            .ok_or_else(|| Error::protocol(SERVICE, "crawl status response has no status"))?;

        Ok(JobState {
            status: JobStatus::parse(&status),
            error: info.error,
        })
    }

    async fn list_pages(&self, job_id: &str) -> Result<Vec<PageDescriptor>> {
        let listing: CrawlPages = self
            .http
            .json(SERVICE, |c| {
                c.get(format!("{}/crawls/{}/pages", self.base_url, job_id))
                    .bearer_auth(&self.api_key)
            })
            .await?;

        Ok(listing
            .pages
            .into_iter()
            .filter_map(|page| match (page.url, page.retrieve_id) {
                (Some(url), Some(retrieve_id)) if !url.is_empty() && !retrieve_id.is_empty() => {
                    Some(PageDescriptor { url, retrieve_id })
                }
                (url, _) => {
                    tracing::warn!(job_id, ?url, "Skipping crawled page without url or retrieve_id");
                    None
                }
            })
            .collect())
    }

    async fn retrieve(&self, page: &PageDescriptor) -> Result<String> {
        let retrieved: Retrieved = self
            .http
            .json(SERVICE, |c| {
                c.get(format!("{}/retrieve", self.base_url))
                    .bearer_auth(&self.api_key)
                    .query(&[
                        ("retrieve_id", page.retrieve_id.as_str()),
                        ("formats", MARKDOWN_FORMATS),
                    ])
            })
            .await?;

        Ok(retrieved.markdown_content.unwrap_or_default())
    }
}

/// Crawl a site through Olostep and return its pages as one URL-ordered document
pub struct OlostepCrawlTool {
    adapter: AdapterContext,
}

impl OlostepCrawlTool {
    pub const NAME: &'static str = "olostep_crawl_website";

    pub fn new(adapter: AdapterContext) -> Self {
        Self { adapter }
    }

    fn orchestrator(&self, cancel: &CancellationToken) -> Result<CrawlOrchestrator> {
        let settings = self.adapter.config().crawl_settings()?;
        let client =
            OlostepClient::from_context(&self.adapter, Self::NAME)?.with_cancellation(cancel.clone());
        Ok(CrawlOrchestrator::new(
            Arc::new(client),
            CrawlConfig::from(settings),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct CrawlParams {
    start_url: String,
    max_pages: Option<u32>,
}

#[async_trait]
impl Tool for OlostepCrawlTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Crawl a website starting from a URL and return the markdown of every crawled page, \
         formatted as 'url\\ncontent' entries separated by blank lines and ordered by URL."
    }

    fn schema(&self) -> Value {
        ToolSchema::new()
            .property("start_url", "string", "Absolute URL where the crawl starts")
            .property_with_default(
                "max_pages",
                "integer",
                "Maximum number of pages to crawl",
                json!(self
                    .adapter
                    .config()
                    .crawl
                    .as_ref()
                    .map(|c| c.default_max_pages)
                    .unwrap_or(50)),
            )
            .required("start_url")
            .build()
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::new(ToolKind::Scrape).requires_env(API_KEY_VAR)
    }

    fn is_long_running(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        let params: CrawlParams = parse_params(params)?;
        let cancel = ctx.cancellation_token();
        let orchestrator = self.orchestrator(&cancel)?;

        tracing::debug!(
            invocation_id = %ctx.invocation_id(),
            start_url = %params.start_url,
            "Crawling website via Olostep"
        );

        let report = orchestrator
            .crawl(&params.start_url, params.max_pages, &cancel)
            .await?;

        ToolResponse::from_serializable(&report)
    }
}

/// Olostep scrape, web search and crawl tools
pub fn create_olostep_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![
        Arc::new(create_scrape_tool(ctx.clone())?),
        Arc::new(create_web_search_tool(ctx.clone())?),
        Arc::new(OlostepCrawlTool::new(ctx.clone())),
    ])
}

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    url: String,
    #[serde(default)]
    wait_before_scraping: u64,
    country: Option<String>,
}

fn create_scrape_tool(adapter: AdapterContext) -> Result<FunctionTool> {
    const NAME: &str = "olostep_scrape_website";

    let schema = ToolSchema::new()
        .property("url", "string", "Website URL to scrape")
        .property_with_default(
            "wait_before_scraping",
            "integer",
            "Milliseconds to wait before scraping",
            json!(0),
        )
        .property(
            "country",
            "string",
            "Residential country to load the request from (e.g. US, CA, GB)",
        )
        .required("url")
        .build();

    FunctionTool::builder()
        .name(NAME)
        .description("Scrape a single web page through Olostep and return its markdown content")
        .schema(schema)
        .capabilities(ToolCapabilities::new(ToolKind::Scrape).requires_env(API_KEY_VAR))
        .execute(move |ctx, params| {
            let adapter = adapter.clone();
            async move {
                let params: ScrapeParams = parse_params(params)?;
                require_non_empty("url", &params.url)?;
                tracing::debug!(invocation_id = %ctx.invocation_id(), url = %params.url, "Olostep scrape");

                let client = OlostepClient::from_context(&adapter, NAME)?;
                let markdown = client
                    .scrape(
                        &params.url,
                        params.wait_before_scraping,
                        params.country.as_deref(),
                    )
                    .await?;

                Ok(ToolResponse::new(json!({
                    "url": params.url,
                    "markdown_content": markdown,
                })))
            }
        })
        .build()
}

#[derive(Debug, Deserialize)]
struct WebSearchParams {
    query: String,
    #[serde(default = "default_country")]
    country: String,
    #[serde(default = "default_language")]
    language: String,
}

fn default_country() -> String {
    "us".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn create_web_search_tool(adapter: AdapterContext) -> Result<FunctionTool> {
    const NAME: &str = "olostep_web_search";

    let schema = ToolSchema::new()
        .property("query", "string", "The search query")
        .property_with_default("country", "string", "Country code for results", json!("us"))
        .property_with_default("language", "string", "Language code for results", json!("en"))
        .required("query")
        .build();

    FunctionTool::builder()
        .name(NAME)
        .description("Search Google through Olostep's SERP parser and return structured results")
        .schema(schema)
        .capabilities(ToolCapabilities::new(ToolKind::Search).requires_env(API_KEY_VAR))
        .execute(move |_ctx, params| {
            let adapter = adapter.clone();
            async move {
                let params: WebSearchParams = parse_params(params)?;
                require_non_empty("query", &params.query)?;

                let client = OlostepClient::from_context(&adapter, NAME)?;
                let results = client
                    .web_search(&params.query, &params.country, &params.language)
                    .await?;

                Ok(ToolResponse::new(results))
            }
        })
        .build()
}
