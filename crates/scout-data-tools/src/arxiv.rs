//! arXiv paper search, lookup, PDF download and reading
//!
//! Talks to the Atom export API. Parsing the feed needs the `arxiv` feature
//! and reading a paper's text also needs `pdf`; without them the tools are
//! still listed but report the missing dependency.

use scout_core::{AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";

const SERVICE: &str = "arxiv";

/// Extracted text shorter than this is replaced by the abstract
const MIN_CONTENT_CHARS: usize = 100;

/// Result ordering accepted by the export API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    /// Unknown values fall back to relevance
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "lastUpdatedDate" => SortBy::LastUpdatedDate,
            "submittedDate" => SortBy::SubmittedDate,
            "relevance" | "" => SortBy::Relevance,
            other => {
                tracing::debug!(sort_by = other, "Unknown sort criterion, using relevance");
                SortBy::Relevance
            }
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Unknown values fall back to descending
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "ascending" => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub doi: Option<String>,
    pub primary_category: Option<String>,
    pub categories: Vec<String>,
    pub links: Vec<String>,
    pub pdf_url: Option<String>,
    pub entry_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    pub success: bool,
    pub paper_id: String,
    pub title: String,
    pub filepath: String,
    pub pdf_url: String,
}

/// A paper's metadata with the text of its first `pages_read` pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperText {
    pub success: bool,
    pub paper_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub content: String,
    pub total_pages: usize,
    pub pages_read: usize,
    pub pdf_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Extracted {
    content: String,
    total_pages: usize,
    pages_read: usize,
}

#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: HttpClient,
    base_url: String,
}

impl ArxivClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self::new(ctx.http().clone(), ctx.endpoint(SERVICE, DEFAULT_BASE_URL))
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> Result<Vec<Paper>> {
        let max_results = max_results.to_string();
        self.query(&[
            ("search_query", query),
            ("start", "0"),
            ("max_results", max_results.as_str()),
            ("sortBy", sort_by.as_str()),
            ("sortOrder", sort_order.as_str()),
        ])
        .await
    }

    pub async fn paper(&self, paper_id: &str) -> Result<Paper> {
        self.query(&[("id_list", paper_id), ("max_results", "1")])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("Paper with ID {} not found", paper_id)))
    }

    /// Download the paper's PDF and extract its text page by page.
    ///
    /// A PDF that cannot be parsed, or yields almost no text, is not an
    /// error: `content` then carries the abstract instead.
    pub async fn read(&self, paper_id: &str, max_pages: Option<usize>) -> Result<PaperText> {
        if !cfg!(feature = "pdf") {
            return Err(missing_feature("pdf"));
        }
        let paper = self.paper(paper_id).await?;
        let pdf_url = paper
            .pdf_url
            .clone()
            .ok_or_else(|| Error::NotFound(format!("Paper {} has no PDF link", paper_id)))?;

        let bytes = self
            .http
            .send_checked(SERVICE, |c| c.get(&pdf_url))
            .await?
            .bytes()
            .await?;
        let extracted = tokio::task::spawn_blocking(move || pdf_text::extract(&bytes, max_pages))
            .await
            .map_err(|e| Error::message(format!("PDF extraction task failed: {}", e)))?;

        let (extracted, error) = match extracted {
            Ok(extracted) => (extracted, None),
            Err(e) => {
                tracing::warn!(paper_id, error = %e, "Could not extract PDF text, using abstract");
                (Extracted::default(), Some(e.to_string()))
            }
        };
        tracing::info!(
            paper_id,
            total_pages = extracted.total_pages,
            pages_read = extracted.pages_read,
            "Read paper"
        );

        let content = if extracted.content.trim().len() < MIN_CONTENT_CHARS {
            format!(
                "Abstract:\n{}\n\nContent could not be extracted properly. \
                 Please try downloading the paper directly.",
                paper.summary
            )
        } else {
            extracted.content
        };

        Ok(PaperText {
            success: error.is_none(),
            paper_id: paper_id.to_string(),
            title: paper.title,
            authors: paper.authors,
            summary: paper.summary,
            content,
            total_pages: extracted.total_pages,
            pages_read: extracted.pages_read,
            pdf_url,
            error,
        })
    }

    /// Save the paper's PDF as `<id>.pdf` (slashes replaced) under `output_dir`
    pub async fn download(&self, paper_id: &str, output_dir: &Path) -> Result<Download> {
        let paper = self.paper(paper_id).await?;
        let pdf_url = paper
            .pdf_url
            .clone()
            .ok_or_else(|| Error::NotFound(format!("Paper {} has no PDF link", paper_id)))?;

        tokio::fs::create_dir_all(output_dir).await?;
        let filepath: PathBuf = output_dir.join(format!("{}.pdf", paper_id.replace('/', "_")));

        let bytes = self
            .http
            .send_checked(SERVICE, |c| c.get(&pdf_url))
            .await?
            .bytes()
            .await?;
        tokio::fs::write(&filepath, &bytes).await?;
        tracing::info!(paper_id, path = %filepath.display(), bytes = bytes.len(), "Downloaded paper");

        Ok(Download {
            success: true,
            paper_id: paper_id.to_string(),
            title: paper.title,
            filepath: filepath.display().to_string(),
            pdf_url,
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Vec<Paper>> {
        if !cfg!(feature = "arxiv") {
            return Err(missing_feature("arxiv"));
        }
        let feed = self
            .http
            .send_checked(SERVICE, |c| c.get(&self.base_url).query(params))
            .await?
            .text()
            .await?;
        feed::parse(&feed)
    }
}

fn missing_feature(dependency: &str) -> Error {
    Error::MissingDependency {
        tool: SERVICE.to_string(),
        dependency: dependency.to_string(),
    }
}

#[cfg(feature = "arxiv")]
mod feed {
    use super::Paper;
    use scout_core::{Error, Result};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Feed {
        #[serde(rename = "entry", default)]
        entries: Vec<Entry>,
    }

    #[derive(Debug, Deserialize)]
    struct Entry {
        id: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        summary: String,
        published: Option<String>,
        updated: Option<String>,
        #[serde(rename = "author", default)]
        authors: Vec<Author>,
        #[serde(rename = "doi", alias = "arxiv:doi")]
        doi: Option<String>,
        #[serde(rename = "link", default)]
        links: Vec<Link>,
        #[serde(rename = "primary_category", alias = "arxiv:primary_category")]
        primary_category: Option<Category>,
        #[serde(rename = "category", default)]
        categories: Vec<Category>,
    }

    #[derive(Debug, Deserialize)]
    struct Author {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Link {
        #[serde(rename = "@href")]
        href: String,
        #[serde(rename = "@title")]
        title: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Category {
        #[serde(rename = "@term")]
        term: String,
    }

    pub(super) fn parse(xml: &str) -> Result<Vec<Paper>> {
        let feed: Feed = quick_xml::de::from_str(xml)
            .map_err(|e| Error::protocol("arxiv", format!("invalid Atom feed: {}", e)))?;

        Ok(feed
            .entries
            .into_iter()
            // Malformed queries come back as a single entry pointing at the errors page
            .filter(|entry| !entry.id.contains("/api/errors"))
            .map(into_paper)
            .collect())
    }

    fn into_paper(entry: Entry) -> Paper {
        let pdf_url = entry
            .links
            .iter()
            .find(|link| link.title.as_deref() == Some("pdf"))
            .map(|link| link.href.clone())
            .or_else(|| {
                entry
                    .id
                    .contains("/abs/")
                    .then(|| entry.id.replacen("/abs/", "/pdf/", 1))
            });

        Paper {
            title: collapse_whitespace(&entry.title),
            authors: entry.authors.into_iter().map(|a| a.name.trim().to_string()).collect(),
            summary: collapse_whitespace(&entry.summary),
            published: entry.published.as_deref().and_then(to_date),
            updated: entry.updated.as_deref().and_then(to_date),
            doi: entry.doi.map(|doi| doi.trim().to_string()),
            primary_category: entry.primary_category.map(|c| c.term),
            categories: entry.categories.into_iter().map(|c| c.term).collect(),
            links: entry.links.into_iter().map(|l| l.href).collect(),
            pdf_url,
            entry_id: entry.id.trim().to_string(),
        }
    }

    fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn to_date(timestamp: &str) -> Option<String> {
        chrono::DateTime::parse_from_rfc3339(timestamp.trim())
            .ok()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
    }
}

#[cfg(not(feature = "arxiv"))]
mod feed {
    use super::Paper;
    use scout_core::Result;

    pub(super) fn parse(_xml: &str) -> Result<Vec<Paper>> {
        Err(super::missing_feature("arxiv"))
    }
}

#[cfg(feature = "pdf")]
mod pdf_text {
    use super::Extracted;
    use lopdf::Document;
    use scout_core::{Error, Result};

    /// Pages with this much text or less are skipped
    const MIN_PAGE_CHARS: usize = 20;

    /// Text of the first `max_pages` pages as `--- Page N ---` sections
    pub(super) fn extract(bytes: &[u8], max_pages: Option<usize>) -> Result<Extracted> {
        let document = Document::load_mem(bytes)
            .map_err(|e| Error::protocol("arxiv", format!("unreadable PDF: {}", e)))?;

        let pages: Vec<u32> = document.get_pages().into_keys().collect();
        let total_pages = pages.len();
        let pages_read = max_pages.map_or(total_pages, |max| max.min(total_pages));

        let sections: Vec<String> = pages[..pages_read]
            .iter()
            .filter_map(|&number| match document.extract_text(&[number]) {
                Ok(text) if text.trim().len() > MIN_PAGE_CHARS => Some(format!(
                    "--- Page {} ---\n{}",
                    number,
                    text.trim().replace("\n\n", "\n")
                )),
                Ok(_) => None,
                Err(e) => Some(format!("--- Page {} ---\n[Error extracting text: {}]", number, e)),
            })
            .collect();

        Ok(Extracted {
            content: sections.join("\n\n"),
            total_pages,
            pages_read,
        })
    }
}

#[cfg(not(feature = "pdf"))]
mod pdf_text {
    use super::Extracted;
    use scout_core::Result;

    pub(super) fn extract(_bytes: &[u8], _max_pages: Option<usize>) -> Result<Extracted> {
        Err(super::missing_feature("pdf"))
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default)]
    sort_order: Option<String>,
}

fn default_max_results() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
struct PaperParams {
    paper_id: String,
}

#[derive(Debug, Deserialize)]
struct ReadParams {
    paper_id: String,
    #[serde(default)]
    max_pages: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    paper_id: String,
    #[serde(default = "default_output_dir")]
    output_dir: String,
}

fn default_output_dir() -> String {
    "./".to_string()
}

/// `arxiv_search`, `arxiv_get_paper`, `arxiv_read_paper` and `arxiv_download_paper`
pub fn create_arxiv_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    let client = ArxivClient::from_context(ctx);
    let capabilities =
        ToolCapabilities::new(ToolKind::Data).depends_on("arxiv", cfg!(feature = "arxiv"));

    let search = {
        let client = client.clone();
        FunctionTool::builder()
            .name("arxiv_search")
            .description("Search arXiv for papers. Returns titles, authors, abstracts, dates, categories and PDF links.")
            .schema(
                ToolSchema::new()
                    .property("query", "string", "Search query, e.g. 'ti:transformers AND cat:cs.CL'")
                    .property_with_default("max_results", "integer", "Maximum number of papers", json!(5))
                    .enum_property(
                        "sort_by",
                        "Sort criterion (default: relevance)",
                        &["relevance", "lastUpdatedDate", "submittedDate"],
                    )
                    .enum_property("sort_order", "Sort order (default: descending)", &["ascending", "descending"])
                    .required("query")
                    .build(),
            )
            .capabilities(capabilities.clone())
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: SearchParams = parse_params(params)?;
                    require_non_empty("query", &params.query)?;
                    let sort_by = SortBy::parse_or_default(params.sort_by.as_deref().unwrap_or_default());
                    let sort_order =
                        SortOrder::parse_or_default(params.sort_order.as_deref().unwrap_or_default());

                    let papers = client
                        .search(&params.query, params.max_results, sort_by, sort_order)
                        .await?;
                    Ok(ToolResponse::new(json!(papers)))
                }
            })
            .build()?
    };

    let get_paper = {
        let client = client.clone();
        FunctionTool::builder()
            .name("arxiv_get_paper")
            .description("Look up a single arXiv paper by its ID (e.g. '2106.09685')")
            .schema(
                ToolSchema::new()
                    .property("paper_id", "string", "The arXiv ID of the paper")
                    .required("paper_id")
                    .build(),
            )
            .capabilities(capabilities.clone())
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: PaperParams = parse_params(params)?;
                    require_non_empty("paper_id", &params.paper_id)?;
                    ToolResponse::from_serializable(&client.paper(params.paper_id.trim()).await?)
                }
            })
            .build()?
    };

    let read = {
        let client = client.clone();
        FunctionTool::builder()
            .name("arxiv_read_paper")
            .description(
                "Read an arXiv paper's text by its ID. Returns metadata and the page-by-page \
                 content, falling back to the abstract when the PDF text cannot be extracted.",
            )
            .schema(
                ToolSchema::new()
                    .property("paper_id", "string", "The arXiv ID of the paper")
                    .property("max_pages", "integer", "Maximum number of pages to read (default: all)")
                    .required("paper_id")
                    .build(),
            )
            .capabilities(capabilities.clone().depends_on("pdf", cfg!(feature = "pdf")))
            .long_running(true)
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: ReadParams = parse_params(params)?;
                    require_non_empty("paper_id", &params.paper_id)?;
                    if params.max_pages == Some(0) {
                        return Err(Error::invalid_params("max_pages must be a positive integer"));
                    }
                    let text = client.read(params.paper_id.trim(), params.max_pages).await?;
                    ToolResponse::from_serializable(&text)
                }
            })
            .build()?
    };

    let download = FunctionTool::builder()
        .name("arxiv_download_paper")
        .description("Download an arXiv paper's PDF into a local directory")
        .schema(
            ToolSchema::new()
                .property("paper_id", "string", "The arXiv ID of the paper")
                .property_with_default("output_dir", "string", "Directory to save the PDF in", json!("./"))
                .required("paper_id")
                .build(),
        )
        .capabilities(capabilities)
        .long_running(true)
        .execute(move |_ctx, params| {
            let client = client.clone();
            async move {
                let params: DownloadParams = parse_params(params)?;
                require_non_empty("paper_id", &params.paper_id)?;
                let download = client
                    .download(params.paper_id.trim(), Path::new(&params.output_dir))
                    .await?;
                ToolResponse::from_serializable(&download)
            }
        })
        .build()?;

    Ok(vec![
        Arc::new(search),
        Arc::new(get_paper),
        Arc::new(read),
        Arc::new(download),
    ])
}

#[cfg(all(test, feature = "arxiv"))]
mod tests {
    use super::*;
    use mockito::Matcher;
    use scout_core::HttpSettings;

    fn entry_feed(pdf_base: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/2106.09685v2</id>
    <updated>2021-10-16T18:40:34Z</updated>
    <published>2021-06-17T17:37:18Z</published>
    <title>LoRA: Low-Rank Adaptation of
      Large Language Models</title>
    <summary>  An important paradigm of natural language
 processing consists of large-scale pre-training.
    </summary>
    <author><name>Edward J. Hu</name></author>
    <author><name>Yelong Shen</name></author>
    <arxiv:doi>10.48550/arXiv.2106.09685</arxiv:doi>
    <link href="http://arxiv.org/abs/2106.09685v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="{pdf_base}/pdf/2106.09685v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#
        )
    }

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/xyz</id>
</feed>"#;

    fn client(server: &mockito::Server) -> ArxivClient {
        ArxivClient::new(
            HttpClient::new(&HttpSettings::default()).unwrap(),
            format!("{}/api/query", server.url()),
        )
    }

    #[test]
    fn test_sort_fallbacks() {
        assert_eq!(SortBy::parse_or_default("submittedDate"), SortBy::SubmittedDate);
        assert_eq!(SortBy::parse_or_default("citations"), SortBy::Relevance);
        assert_eq!(SortOrder::parse_or_default("ascending"), SortOrder::Ascending);
        assert_eq!(SortOrder::parse_or_default("sideways"), SortOrder::Descending);
    }

    #[test]
    fn test_parse_entry_fields() {
        let papers = feed::parse(&entry_feed("http://arxiv.org")).unwrap();
        assert_eq!(papers.len(), 1);

        let paper = &papers[0];
        assert_eq!(paper.title, "LoRA: Low-Rank Adaptation of Large Language Models");
        assert_eq!(paper.authors, vec!["Edward J. Hu", "Yelong Shen"]);
        assert!(paper.summary.starts_with("An important paradigm of natural language processing"));
        assert_eq!(paper.published.as_deref(), Some("2021-06-17"));
        assert_eq!(paper.updated.as_deref(), Some("2021-10-16"));
        assert_eq!(paper.doi.as_deref(), Some("10.48550/arXiv.2106.09685"));
        assert_eq!(paper.primary_category.as_deref(), Some("cs.CL"));
        assert_eq!(paper.categories, vec!["cs.CL", "cs.LG"]);
        assert_eq!(paper.links.len(), 2);
        assert_eq!(paper.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2106.09685v2"));
        assert_eq!(paper.entry_id, "http://arxiv.org/abs/2106.09685v2");
    }

    #[tokio::test]
    async fn test_search_sends_sort_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "lora".into()),
                Matcher::UrlEncoded("max_results".into(), "3".into()),
                Matcher::UrlEncoded("sortBy".into(), "submittedDate".into()),
                Matcher::UrlEncoded("sortOrder".into(), "descending".into()),
            ]))
            .with_status(200)
            .with_body(entry_feed("http://arxiv.org"))
            .create_async()
            .await;

        let papers = client(&server)
            .search("lora", 3, SortBy::SubmittedDate, SortOrder::default())
            .await
            .unwrap();

        assert_eq!(papers.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_paper_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("id_list".into(), "9999.99999".into()))
            .with_status(200)
            .with_body(EMPTY_FEED)
            .create_async()
            .await;

        let err = client(&server).paper("9999.99999").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_download_writes_pdf() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("id_list".into(), "2106.09685".into()))
            .with_status(200)
            .with_body(entry_feed(&base))
            .create_async()
            .await;
        server
            .mock("GET", "/pdf/2106.09685v2")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4 test")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("papers");
        let download = client(&server).download("2106.09685", &output).await.unwrap();

        assert!(download.success);
        assert_eq!(download.title, "LoRA: Low-Rank Adaptation of Large Language Models");
        let expected = output.join("2106.09685.pdf");
        assert_eq!(download.filepath, expected.display().to_string());
        assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_download_replaces_slashes_in_old_style_ids() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/api/query")
            .with_status(200)
            .with_body(entry_feed(&base))
            .create_async()
            .await;
        server
            .mock("GET", "/pdf/2106.09685v2")
            .with_status(200)
            .with_body("%PDF")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let download = client(&server)
            .download("hep-th/9901001", dir.path())
            .await
            .unwrap();

        assert!(download.filepath.ends_with("hep-th_9901001.pdf"));
    }

    #[cfg(feature = "pdf")]
    mod read {
        use super::*;
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        const PAGE_ONE: &str = "Low-rank adaptation freezes the pretrained model weights and injects trainable \
            rank decomposition matrices into each layer of the Transformer architecture.";
        const PAGE_TWO: &str = "Compared to GPT-3 175B fine-tuned with Adam, LoRA can reduce the number of \
            trainable parameters by 10,000 times and the GPU memory requirement by 3 times.";

        /// Single-font PDF with one line of text per page
        fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
            let mut doc = Document::with_version("1.5");
            let pages_id = doc.new_object_id();
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            let resources_id = doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            });

            let mut kids: Vec<Object> = Vec::new();
            for text in texts {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 10.into()]),
                        Operation::new("Td", vec![20.into(), 700.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                    "Resources" => resources_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                });
                kids.push(page_id.into());
            }

            let count = kids.len() as i64;
            doc.objects.insert(
                pages_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Pages",
                    "Kids" => kids,
                    "Count" => count,
                }),
            );
            let catalog_id = doc.add_object(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            });
            doc.trailer.set("Root", catalog_id);

            let mut bytes = Vec::new();
            doc.save_to(&mut bytes).unwrap();
            bytes
        }

        async fn serve_paper(server: &mut mockito::Server, pdf: Vec<u8>) {
            let base = server.url();
            server
                .mock("GET", "/api/query")
                .match_query(Matcher::UrlEncoded("id_list".into(), "2106.09685".into()))
                .with_status(200)
                .with_body(entry_feed(&base))
                .create_async()
                .await;
            server
                .mock("GET", "/pdf/2106.09685v2")
                .with_status(200)
                .with_header("content-type", "application/pdf")
                .with_body(pdf)
                .create_async()
                .await;
        }

        #[test]
        fn test_extract_honours_max_pages() {
            let extracted = pdf_text::extract(&pdf_with_pages(&[PAGE_ONE, PAGE_TWO]), Some(1)).unwrap();

            assert_eq!(extracted.total_pages, 2);
            assert_eq!(extracted.pages_read, 1);
            assert!(extracted.content.starts_with("--- Page 1 ---\n"));
            assert!(extracted.content.contains("Low-rank adaptation"));
            assert!(!extracted.content.contains("--- Page 2 ---"));
        }

        #[tokio::test]
        async fn test_read_returns_every_page() {
            let mut server = mockito::Server::new_async().await;
            serve_paper(&mut server, pdf_with_pages(&[PAGE_ONE, PAGE_TWO])).await;

            let text = client(&server).read("2106.09685", None).await.unwrap();

            assert!(text.success);
            assert_eq!(text.total_pages, 2);
            assert_eq!(text.pages_read, 2);
            assert_eq!(text.authors, vec!["Edward J. Hu", "Yelong Shen"]);
            assert!(text.content.contains("--- Page 1 ---"));
            assert!(text.content.contains("--- Page 2 ---"));
            assert!(text.content.contains("GPU memory requirement"));
            assert!(text.pdf_url.ends_with("/pdf/2106.09685v2"));
        }

        #[tokio::test]
        async fn test_blank_pages_fall_back_to_abstract() {
            let mut server = mockito::Server::new_async().await;
            serve_paper(&mut server, pdf_with_pages(&["", "short"])).await;

            let text = client(&server).read("2106.09685", None).await.unwrap();

            assert!(text.success);
            assert_eq!(text.total_pages, 2);
            assert!(text.content.starts_with("Abstract:\nAn important paradigm"));
            assert!(text.content.ends_with("Please try downloading the paper directly."));
        }

        #[tokio::test]
        async fn test_unreadable_pdf_keeps_abstract() {
            let mut server = mockito::Server::new_async().await;
            serve_paper(&mut server, b"<html>not a pdf</html>".to_vec()).await;

            let text = client(&server).read("2106.09685", Some(3)).await.unwrap();

            assert!(!text.success);
            assert!(text.error.is_some());
            assert_eq!(text.total_pages, 0);
            assert_eq!(text.pages_read, 0);
            assert!(text.content.starts_with("Abstract:\n"));
        }

        #[tokio::test]
        async fn test_read_tool_rejects_zero_pages() {
            let ctx = AdapterContext::from_config(scout_core::ScoutConfig::default()).unwrap();
            let tools = create_arxiv_tools(&ctx).unwrap();
            let read = tools.iter().find(|t| t.name() == "arxiv_read_paper").unwrap();

            assert!(read.is_long_running());
            assert!(read.capabilities().analyze_dependencies()["pdf"]);
            let err = read
                .execute(
                    Arc::new(scout_tool::DefaultToolContext::generated()),
                    json!({"paper_id": "2106.09685", "max_pages": 0}),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidParams(_)));
        }
    }
}
