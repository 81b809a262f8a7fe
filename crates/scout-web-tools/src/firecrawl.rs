//! Firecrawl search, scrape and crawl API

use crate::crawl::{CrawlConfig, JobStatus, PollOutcome};
use scout_core::{AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v1";
pub const API_KEY_VAR: &str = "FIRECRAWL_API_KEY";

const SERVICE: &str = "firecrawl";

/// Body of `POST /search`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tbs: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_search_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub scrape_options: Map<String, Value>,
}

/// Body of `POST /scrape`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    #[serde(default = "default_true")]
    pub only_main_content: bool,
    #[serde(default)]
    pub include_tags: Vec<String>,
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub wait_for: u64,
    #[serde(default = "default_scrape_timeout")]
    pub timeout: u64,
}

fn default_search_limit() -> u32 {
    5
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_search_timeout() -> u64 {
    60_000
}

fn default_formats() -> Vec<String> {
    vec!["markdown".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_scrape_timeout() -> u64 {
    30_000
}

#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl FirecrawlClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

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

    pub async fn search(&self, request: &SearchRequest) -> Result<Value> {
        let body = self.post("search", request).await?;
        take_data(body)
    }

    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<Value> {
        let body = self.post("scrape", request).await?;
        take_data(body)
    }

    /// Start a crawl job; `crawler_options` are merged into the request body
    pub async fn start_crawl(
        &self,
        url: &str,
        limit: Option<u32>,
        crawler_options: &Map<String, Value>,
    ) -> Result<String> {
        let mut payload = crawler_options.clone();
        payload.insert("url".to_string(), json!(url));
        if let Some(limit) = limit {
            payload.insert("limit".to_string(), json!(limit));
        }

        let body = self.post("crawl", &payload).await?;
        body["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::protocol(SERVICE, "crawl response has no id"))
    }

    /// One page of crawl status; `next` links to further results when present
    pub async fn crawl_status(&self, job_id: &str) -> Result<Value> {
        let url = format!("{}/crawl/{}", self.base_url, job_id);
        self.get(&url).await
    }

    /// Poll a crawl to completion and collect every page of results
    pub async fn wait_for_crawl(
        &self,
        job_id: &str,
        config: &CrawlConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>> {
        let first = config
            .poller()
            .poll(job_id, cancel, move || async move {
                let body = self.crawl_status(job_id).await?;
                let status = body["status"].as_str().ok_or_else(|| {
                    Error::protocol(SERVICE, "crawl status response has no status")
                })?;

                Ok(match JobStatus::parse(status) {
                    JobStatus::Completed => PollOutcome::Done(body),
                    JobStatus::Failed => PollOutcome::Failed(
                        body["error"]
                            .as_str()
                            .unwrap_or("Unknown error")
                            .to_string(),
                    ),
                    JobStatus::Pending | JobStatus::Running => PollOutcome::Pending,
                })
            })
            .await?;

        let mut data = data_items(&first);
        let mut next = next_link(&first);
        let mut seen = HashSet::new();

        while let Some(url) = next {
            if !seen.insert(url.clone()) {
                tracing::warn!(job_id, url = %url, "Crawl pagination repeated a link, stopping");
                break;
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let url = self.same_origin(&url)?;
            let page = self.get(&url).await?;
            data.extend(data_items(&page));
            next = next_link(&page);
        }

        tracing::info!(job_id, pages = data.len(), "Firecrawl crawl collected");
        Ok(data)
    }

    /// Resolve a pagination link and refuse one that leaves the API host,
    /// since it is fetched with the bearer token attached
    fn same_origin(&self, link: &str) -> Result<String> {
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| Error::config_error(format!("invalid Firecrawl base URL: {}", e)))?;
        let resolved = base
            .join(link)
            .map_err(|e| Error::protocol(SERVICE, format!("invalid pagination link: {}", e)))?;

        if resolved.origin() != base.origin() {
            tracing::warn!(link, "Firecrawl pagination link points to another host");
            return Err(Error::protocol(
                SERVICE,
                format!("pagination link {} is outside the API host", resolved),
            ));
        }
        Ok(resolved.into())
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body: Value = self
            .http
            .json(SERVICE, |c| {
                c.post(format!("{}/{}", self.base_url, path))
                    .bearer_auth(&self.api_key)
                    .json(body)
            })
            .await?;
        ensure_succeeded(body)
    }

    async fn get(&self, url: &str) -> Result<Value> {
        let body: Value = self
            .http
            .json(SERVICE, |c| c.get(url).bearer_auth(&self.api_key))
            .await?;
        ensure_succeeded(body)
    }
}

/// Firecrawl reports some failures with a 200 status and `success: false`
fn ensure_succeeded(body: Value) -> Result<Value> {
    if body["success"].as_bool() == Some(false) {
        let message = body["error"].as_str().unwrap_or("request was not successful");
        return Err(Error::protocol(SERVICE, message));
    }
    Ok(body)
}

fn take_data(mut body: Value) -> Result<Value> {
    match body.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Err(Error::protocol(SERVICE, "response has no data field")),
    }
}

fn data_items(body: &Value) -> Vec<Value> {
    body["data"].as_array().cloned().unwrap_or_default()
}

fn next_link(body: &Value) -> Option<String> {
    body["next"]
        .as_str()
        .filter(|next| !next.is_empty())
        .map(str::to_string)
}

/// Firecrawl search, scrape and crawl tools
pub fn create_firecrawl_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![
        Arc::new(create_search_tool(ctx.clone())?),
        Arc::new(create_scrape_tool(ctx.clone())?),
        Arc::new(create_crawl_tool(ctx.clone())?),
    ])
}

fn capabilities(kind: ToolKind) -> ToolCapabilities {
    ToolCapabilities::new(kind).requires_env(API_KEY_VAR)
}

fn create_search_tool(adapter: AdapterContext) -> Result<FunctionTool> {
    const NAME: &str = "firecrawl_search";

    let schema = ToolSchema::new()
        .property("query", "string", "The search query")
        .property_with_default("limit", "integer", "Maximum number of results", json!(5))
        .property("tbs", "string", "Time-based search filter (e.g. qdr:w)")
        .property_with_default("lang", "string", "Language code", json!("en"))
        .property_with_default("country", "string", "Country code", json!("us"))
        .property("location", "string", "Location to search from")
        .property_with_default("timeout", "integer", "Timeout in milliseconds", json!(60000))
        .property("scrapeOptions", "object", "Options for scraping each result")
        .required("query")
        .build();

    FunctionTool::builder()
        .name(NAME)
        .description("Search the web with Firecrawl and optionally scrape each result")
        .schema(schema)
        .capabilities(capabilities(ToolKind::Search))
        .execute(move |_ctx, params| {
            let adapter = adapter.clone();
            async move {
                let request: SearchRequest = parse_params(params)?;
                require_non_empty("query", &request.query)?;

                let client = FirecrawlClient::from_context(&adapter, NAME)?;
                Ok(ToolResponse::new(client.search(&request).await?))
            }
        })
        .build()
}

fn create_scrape_tool(adapter: AdapterContext) -> Result<FunctionTool> {
    const NAME: &str = "firecrawl_scrape_website";

    let schema = ToolSchema::new()
        .property("url", "string", "Website URL to scrape")
        .array_property("formats", "string", "Output formats (default: [\"markdown\"])")
        .property_with_default(
            "onlyMainContent",
            "boolean",
            "Extract only the main content",
            json!(true),
        )
        .array_property("includeTags", "string", "HTML tags to include")
        .array_property("excludeTags", "string", "HTML tags to exclude")
        .property("headers", "object", "Custom HTTP headers for the request")
        .property_with_default(
            "waitFor",
            "integer",
            "Milliseconds to wait for JavaScript",
            json!(0),
        )
        .property_with_default("timeout", "integer", "Timeout in milliseconds", json!(30000))
        .required("url")
        .build();

    FunctionTool::builder()
        .name(NAME)
        .description("Scrape a web page with Firecrawl and return its content in the requested formats")
        .schema(schema)
        .capabilities(capabilities(ToolKind::Scrape))
        .execute(move |_ctx, params| {
            let adapter = adapter.clone();
            async move {
                let request: ScrapeRequest = parse_params(params)?;
                require_non_empty("url", &request.url)?;

                let client = FirecrawlClient::from_context(&adapter, NAME)?;
                Ok(ToolResponse::new(client.scrape(&request).await?))
            }
        })
        .build()
}

#[derive(Debug, Deserialize)]
struct CrawlParams {
    url: String,
    limit: Option<u32>,
    #[serde(default)]
    crawler_options: Map<String, Value>,
}

fn create_crawl_tool(adapter: AdapterContext) -> Result<FunctionTool> {
    const NAME: &str = "firecrawl_crawl_website";

    let schema = ToolSchema::new()
        .property("url", "string", "Website URL to crawl")
        .property("limit", "integer", "Maximum number of pages to crawl")
        .property(
            "crawler_options",
            "object",
            "Additional crawl options merged into the request (e.g. includePaths, maxDepth)",
        )
        .required("url")
        .build();

    FunctionTool::builder()
        .name(NAME)
        .description("Crawl a website with Firecrawl and return the content of every crawled page")
        .schema(schema)
        .capabilities(capabilities(ToolKind::Scrape))
        .long_running(true)
        .execute(move |ctx, params| {
            let adapter = adapter.clone();
            async move {
                let params: CrawlParams = parse_params(params)?;
                require_non_empty("url", &params.url)?;
                let config = CrawlConfig::from(adapter.config().crawl_settings()?);

                let cancel = ctx.cancellation_token();
                let client =
                    FirecrawlClient::from_context(&adapter, NAME)?.with_cancellation(cancel.clone());
                let job_id = client
                    .start_crawl(&params.url, params.limit, &params.crawler_options)
                    .await?;
                tracing::info!(
                    invocation_id = %ctx.invocation_id(),
                    job_id = %job_id,
                    url = %params.url,
                    "Firecrawl crawl started"
                );

                let data = client
                    .wait_for_crawl(&job_id, &config, &cancel)
                    .await?;

                Ok(ToolResponse::new(json!({
                    "id": job_id,
                    "status": "completed",
                    "total": data.len(),
                    "data": data,
                })))
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use scout_core::{HttpSettings, ScoutConfig};
    use std::time::Duration;

    fn client(server: &mockito::Server) -> FirecrawlClient {
        let http = HttpClient::new(&HttpSettings::default()).unwrap();
        FirecrawlClient::new(http, server.url(), "fc-key")
    }

    #[test]
    fn test_search_request_defaults() {
        let request: SearchRequest = parse_params(json!({"query": "rust"})).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["limit"], 5);
        assert_eq!(body["lang"], "en");
        assert_eq!(body["country"], "us");
        assert_eq!(body["timeout"], 60000);
        assert_eq!(body["scrapeOptions"], json!({}));
        assert!(body.get("tbs").is_none());
    }

    #[tokio::test]
    async fn test_scrape_posts_camel_case_options() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/scrape")
            .match_header("authorization", "Bearer fc-key")
            .match_body(Matcher::PartialJson(json!({
                "url": "https://example.com",
                "formats": ["markdown"],
                "onlyMainContent": true,
                "waitFor": 0,
                "timeout": 30000
            })))
            .with_status(200)
            .with_body(r##"{"success": true, "data": {"markdown": "# Example"}}"##)
            .create_async()
            .await;

        let request: ScrapeRequest = parse_params(json!({"url": "https://example.com"})).unwrap();
        let data = client(&server).scrape(&request).await.unwrap();

        assert_eq!(data["markdown"], "# Example");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unsuccessful_body_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/search")
            .with_status(200)
            .with_body(r#"{"success": false, "error": "bad query"}"#)
            .create_async()
            .await;

        let request: SearchRequest = parse_params(json!({"query": "x"})).unwrap();
        let err = client(&server).search(&request).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { ref message, .. } if message == "bad query"));
    }

    #[tokio::test]
    async fn test_start_crawl_merges_options() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/crawl")
            .match_body(Matcher::Json(json!({
                "url": "https://example.com",
                "limit": 10,
                "maxDepth": 2
            })))
            .with_status(200)
            .with_body(r#"{"success": true, "id": "crawl-1"}"#)
            .create_async()
            .await;

        let mut options = Map::new();
        options.insert("maxDepth".to_string(), json!(2));
        let id = client(&server)
            .start_crawl("https://example.com", Some(10), &options)
            .await
            .unwrap();

        assert_eq!(id, "crawl-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_wait_for_crawl_follows_next_links() {
        let mut server = mockito::Server::new_async().await;
        let next = format!("{}/crawl/crawl-1/results-2", server.url());
        server
            .mock("GET", "/crawl/crawl-1")
            .with_status(200)
            .with_body(
                json!({
                    "status": "completed",
                    "data": [{"markdown": "page one"}],
                    "next": next
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/crawl/crawl-1/results-2")
            .with_status(200)
            .with_body(r#"{"status": "completed", "data": [{"markdown": "page two"}]}"#)
            .create_async()
            .await;

        let data = client(&server)
            .wait_for_crawl(
                "crawl-1",
                &CrawlConfig::new(Duration::from_secs(30)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data[1]["markdown"], "page two");
    }

    #[tokio::test]
    async fn test_next_link_to_foreign_host_is_refused() {
        let mut server = mockito::Server::new_async().await;
        let mut foreign = mockito::Server::new_async().await;
        let leaked = foreign
            .mock("GET", Matcher::Any)
            .match_header("authorization", "Bearer fc-key")
            .expect(0)
            .create_async()
            .await;
        server
            .mock("GET", "/crawl/crawl-3")
            .with_status(200)
            .with_body(
                json!({
                    "status": "completed",
                    "data": [{"markdown": "page one"}],
                    "next": format!("{}/collect", foreign.url())
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server)
            .wait_for_crawl(
                "crawl-3",
                &CrawlConfig::new(Duration::from_secs(30)),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Protocol { .. }));
        leaked.assert_async().await;
    }

    #[tokio::test]
    async fn test_relative_next_link_resolves_against_api_host() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/crawl/crawl-4")
            .with_status(200)
            .with_body(
                r#"{"status": "completed", "data": [{"markdown": "one"}], "next": "/crawl/crawl-4/results-2"}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/crawl/crawl-4/results-2")
            .match_header("authorization", "Bearer fc-key")
            .with_status(200)
            .with_body(r#"{"status": "completed", "data": [{"markdown": "two"}]}"#)
            .create_async()
            .await;

        let data = client(&server)
            .wait_for_crawl(
                "crawl-4",
                &CrawlConfig::new(Duration::from_secs(30)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(data.len(), 2);
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_crawl_reports_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/crawl/crawl-2")
            .with_status(200)
            .with_body(r#"{"status": "failed", "error": "site unreachable"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .wait_for_crawl(
                "crawl-2",
                &CrawlConfig::new(Duration::from_secs(30)),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::JobFailed { ref detail, .. } if detail == "site unreachable"));
    }

    #[tokio::test]
    async fn test_crawl_tool_requires_crawl_settings() {
        let config = ScoutConfig::from_toml_str("[credentials]\nFIRECRAWL_API_KEY = \"k\"\n").unwrap();
        let tools = create_firecrawl_tools(&AdapterContext::from_config(config).unwrap()).unwrap();
        let crawl = tools
            .iter()
            .find(|t| t.name() == "firecrawl_crawl_website")
            .unwrap();

        assert!(crawl.is_long_running());
        let err = crawl
            .execute(
                Arc::new(scout_tool::DefaultToolContext::generated()),
                json!({"url": "https://example.com"}),
            )
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
