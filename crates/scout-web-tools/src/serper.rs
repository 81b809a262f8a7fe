//! Google search through the Serper API

use scout_core::{AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://google.serper.dev";
pub const API_KEY_VAR: &str = "SERPER_API_KEY";

const SERVICE: &str = "serper";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Search,
    News,
}

impl FromStr for SearchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "search" => Ok(SearchType::Search),
            "news" => Ok(SearchType::News),
            other => Err(Error::invalid_params(format!(
                "Invalid search type: {}. Must be one of: search, news",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchType::Search => "search",
            SearchType::News => "news",
        })
    }
}

/// One Serper request
#[derive(Debug, Clone)]
pub struct SerperQuery {
    pub q: String,
    pub search_type: SearchType,
    pub num: usize,
    pub gl: Option<String>,
    pub location: Option<String>,
    pub hl: Option<String>,
}

impl SerperQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            search_type: SearchType::Search,
            num: 10,
            gl: Some("us".to_string()),
            location: None,
            hl: Some("en".to_string()),
        }
    }

    fn payload(&self) -> Value {
        let mut payload = json!({ "q": self.q, "num": self.num });
        if let Some(gl) = &self.gl {
            payload["gl"] = json!(gl);
        }
        if let Some(location) = &self.location {
            payload["location"] = json!(location);
        }
        if let Some(hl) = &self.hl {
            payload["hl"] = json!(hl);
        }
        payload
    }
}

#[derive(Debug, Clone)]
pub struct SerperClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl SerperClient {
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

    /// Run a web or news search and reshape the provider's response
    pub async fn search(&self, query: &SerperQuery) -> Result<Value> {
        let results = self
            .post(&query.search_type.to_string(), &query.payload())
            .await?;
        Ok(format_results(query, &results))
    }

    /// Raw `/videos` response
    pub async fn videos(&self, q: &str, gl: &str, hl: &str) -> Result<Value> {
        self.post("videos", &json!({ "q": q, "gl": gl, "hl": hl }))
            .await
    }

    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value> {
        let results: Value = self
            .http
            .json(SERVICE, |c| {
                c.post(format!("{}/{}", self.base_url, endpoint))
                    .header("X-API-KEY", &self.api_key)
                    .timeout(REQUEST_TIMEOUT)
                    .json(payload)
            })
            .await?;

        let empty = match &results {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Err(Error::protocol(SERVICE, "empty response"));
        }
        Ok(results)
    }
}

fn format_results(query: &SerperQuery, results: &Value) -> Value {
    let mut parameters = Map::new();
    parameters.insert("q".to_string(), json!(query.q));
    parameters.insert("type".to_string(), json!(query.search_type.to_string()));
    if let Some(provided) = results["searchParameters"].as_object() {
        parameters.extend(provided.clone());
    }

    let mut formatted = Map::new();
    formatted.insert("searchParameters".to_string(), Value::Object(parameters));

    let limit = query.num;
    match query.search_type {
        SearchType::Search => {
            if let Some(kg) = results.get("knowledgeGraph") {
                formatted.insert("knowledgeGraph".to_string(), knowledge_graph(kg));
            }
            if let Some(items) = results["organic"].as_array() {
                formatted.insert("organic".to_string(), collect(items, limit, organic));
            }
            if let Some(items) = results["peopleAlsoAsk"].as_array() {
                formatted.insert("peopleAlsoAsk".to_string(), collect(items, limit, people_also_ask));
            }
            if let Some(items) = results["relatedSearches"].as_array() {
                formatted.insert(
                    "relatedSearches".to_string(),
                    collect(items, limit, |item| Some(json!({ "query": item["query"].as_str()? }))),
                );
            }
        }
        SearchType::News => {
            if let Some(items) = results["news"].as_array() {
                formatted.insert("news".to_string(), collect(items, limit, news));
            }
        }
    }

    formatted.insert(
        "credits".to_string(),
        results.get("credits").cloned().unwrap_or(json!(1)),
    );
    Value::Object(formatted)
}

/// First `limit` entries, skipping ones that lack required keys
fn collect(items: &[Value], limit: usize, map: impl Fn(&Value) -> Option<Value>) -> Value {
    Value::Array(items.iter().take(limit).filter_map(map).collect())
}

fn text(value: &Value, key: &str) -> Value {
    json!(value[key].as_str().unwrap_or_default())
}

fn knowledge_graph(kg: &Value) -> Value {
    json!({
        "title": text(kg, "title"),
        "type": text(kg, "type"),
        "website": text(kg, "website"),
        "imageUrl": text(kg, "imageUrl"),
        "description": text(kg, "description"),
        "descriptionSource": text(kg, "descriptionSource"),
        "descriptionLink": text(kg, "descriptionLink"),
        "attributes": kg.get("attributes").cloned().unwrap_or_else(|| json!({})),
    })
}

fn organic(item: &Value) -> Option<Value> {
    let mut entry = json!({
        "title": item["title"].as_str()?,
        "link": item["link"].as_str()?,
        "snippet": text(item, "snippet"),
        "position": item.get("position").cloned().unwrap_or(Value::Null),
    });

    if let Some(sitelinks) = item["sitelinks"].as_array() {
        entry["sitelinks"] = sitelinks
            .iter()
            .map(|link| json!({ "title": text(link, "title"), "link": text(link, "link") }))
            .collect();
    }
    Some(entry)
}

fn people_also_ask(item: &Value) -> Option<Value> {
    Some(json!({
        "question": item["question"].as_str()?,
        "snippet": text(item, "snippet"),
        "title": text(item, "title"),
        "link": text(item, "link"),
    }))
}

fn news(item: &Value) -> Option<Value> {
    Some(json!({
        "title": item["title"].as_str()?,
        "link": item["link"].as_str()?,
        "snippet": text(item, "snippet"),
        "date": text(item, "date"),
        "source": text(item, "source"),
        "imageUrl": text(item, "imageUrl"),
    }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_search_type")]
    search_type: String,
    #[serde(default = "default_n_results")]
    n_results: usize,
    #[serde(default = "default_country")]
    country: Option<String>,
    location: Option<String>,
    #[serde(default = "default_locale")]
    locale: Option<String>,
}

fn default_search_type() -> String {
    "search".to_string()
}

fn default_n_results() -> usize {
    10
}

fn default_country() -> Option<String> {
    Some("us".to_string())
}

fn default_locale() -> Option<String> {
    Some("en".to_string())
}

pub fn create_serper_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![Arc::new(create_search_tool(ctx.clone())?)])
}

fn create_search_tool(adapter: AdapterContext) -> Result<FunctionTool> {
    const NAME: &str = "serper_search";

    let schema = ToolSchema::new()
        .property("query", "string", "The search query")
        .enum_property("search_type", "Kind of search (default: search)", &["search", "news"])
        .property_with_default("n_results", "integer", "Results per section", json!(10))
        .property_with_default("country", "string", "Country code", json!("us"))
        .property("location", "string", "Location to search from")
        .property_with_default("locale", "string", "Interface language", json!("en"))
        .required("query")
        .build();

    FunctionTool::builder()
        .name(NAME)
        .description(
            "Search Google through Serper. Returns organic results, knowledge graph, \
             related questions and searches, or news articles when search_type is 'news'.",
        )
        .schema(schema)
        .capabilities(ToolCapabilities::new(ToolKind::Search).requires_env(API_KEY_VAR))
        .execute(move |ctx, params| {
            let adapter = adapter.clone();
            async move {
                let params: SearchParams = parse_params(params)?;
                require_non_empty("query", &params.query)?;
                let query = SerperQuery {
                    search_type: params.search_type.parse()?,
                    num: params.n_results,
                    gl: params.country,
                    location: params.location,
                    hl: params.locale,
                    q: params.query,
                };

                tracing::debug!(
                    invocation_id = %ctx.invocation_id(),
                    query = %query.q,
                    search_type = %query.search_type,
                    "Serper search"
                );
                let client = SerperClient::from_context(&adapter, NAME)?;
                Ok(ToolResponse::new(client.search(&query).await?))
            }
        })
        .build()
}
