//! Single-page crawler that runs locally
//!
//! Fetches a page over plain HTTP, converts it to markdown and collects its
//! images and links. There is no JavaScript rendering, so client-side
//! applications come back mostly empty.

use async_trait::async_trait;
use scout_core::{
    AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolContext, ToolKind,
    ToolResponse,
};
use scout_tool::{parse_params, require_non_empty, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const TOOL_NAME: &str = "simple_crawl";

const SERVICE: &str = "simple_crawl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Media {
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Links {
    pub internal: Vec<Link>,
    pub external: Vec<Link>,
}

/// Everything extracted from one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawledPage {
    pub url: String,
    pub title: Option<String>,
    pub raw_markdown: String,
    pub media: Media,
    pub links: Links,
}

pub struct SimpleCrawlTool {
    http: HttpClient,
}

impl SimpleCrawlTool {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self::new(ctx.http().clone())
    }

    pub async fn crawl(&self, url: &str) -> Result<CrawledPage> {
        let page_url = url::Url::parse(url)
            .map_err(|e| Error::invalid_params(format!("Invalid URL '{}': {}", url, e)))?;
        if !cfg!(feature = "html") {
            return Err(missing_html());
        }

        tracing::debug!(url, "Fetching page");
        let html = self
            .http
            .send_checked(SERVICE, |c| c.get(page_url.as_str()))
            .await?
            .text()
            .await?;

        extract_page(&page_url, &html)
    }
}

fn missing_html() -> Error {
    Error::MissingDependency {
        tool: TOOL_NAME.to_string(),
        dependency: "html".to_string(),
    }
}

#[cfg(feature = "html")]
fn extract_page(page_url: &url::Url, html: &str) -> Result<CrawledPage> {
    use crate::html::{selector, text_of};
    use scraper::Html;
    use std::collections::HashSet;

    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());

    let mut images = Vec::new();
    let mut seen_images = HashSet::new();
    for img in document.select(&selector("img[src]")?) {
        let Some(src) = img.value().attr("src").and_then(|src| page_url.join(src).ok()) else {
            continue;
        };
        if seen_images.insert(src.to_string()) {
            images.push(Image {
                src: src.to_string(),
                alt: img.value().attr("alt").unwrap_or_default().trim().to_string(),
            });
        }
    }

    let mut links = Links::default();
    let mut seen_links = HashSet::new();
    for anchor in document.select(&selector("a[href]")?) {
        let Some(mut target) = anchor.value().attr("href").and_then(|href| page_url.join(href).ok())
        else {
            continue;
        };
        if !matches!(target.scheme(), "http" | "https") {
            continue;
        }
        target.set_fragment(None);
        if !seen_links.insert(target.to_string()) {
            continue;
        }

        let link = Link {
            href: target.to_string(),
            text: text_of(anchor),
        };
        if target.host_str() == page_url.host_str() {
            links.internal.push(link);
        } else {
            links.external.push(link);
        }
    }

    let body = document
        .select(&selector("body")?)
        .next()
        .map(|body| body.html())
        .unwrap_or_else(|| html.to_string());
    let raw_markdown = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "iframe"])
        .build()
        .convert(&body)
        .map_err(|e| Error::message(format!("Failed to convert HTML to markdown: {}", e)))?;

    Ok(CrawledPage {
        url: page_url.to_string(),
        title,
        raw_markdown: raw_markdown.trim().to_string(),
        media: Media { images },
        links,
    })
}

#[cfg(not(feature = "html"))]
fn extract_page(_page_url: &url::Url, _html: &str) -> Result<CrawledPage> {
    Err(missing_html())
}

#[derive(Debug, Deserialize)]
struct CrawlParams {
    url: String,
}

#[async_trait]
impl Tool for SimpleCrawlTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch a single web page and return it as markdown together with its images and internal/external links. Does not execute JavaScript."
    }

    fn schema(&self) -> Value {
        ToolSchema::new()
            .property("url", "string", "The URL of the page to crawl")
            .required("url")
            .build()
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::new(ToolKind::Scrape).depends_on("html", cfg!(feature = "html"))
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        let params: CrawlParams = parse_params(params)?;
        require_non_empty("url", &params.url)?;

        let page = self.crawl(&params.url).await?;
        ToolResponse::from_serializable(&page)
    }
}
