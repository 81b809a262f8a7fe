//! YouTube video search via Serper's `/videos` endpoint

use crate::serper::{SerperClient, API_KEY_VAR};
use scout_core::{AdapterContext, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "youtube_search";
const NO_RESULTS_MESSAGE: &str = "No YouTube videos found for the query";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoResult {
    pub title: String,
    pub link: String,
    pub thumbnail: String,
    pub channel: String,
    pub channel_link: String,
    pub date_published: String,
    pub views: String,
    pub description: String,
    pub duration: String,
}

/// Map `videos[]`, or YouTube links in `organic[]` when no video section exists
pub fn extract_videos(response: &Value, limit: usize) -> Vec<VideoResult> {
    if let Some(videos) = response["videos"].as_array() {
        return videos.iter().take(limit).map(video).collect();
    }

    response["organic"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(limit)
                .filter(|item| {
                    item["link"]
                        .as_str()
                        .is_some_and(|link| link.contains("youtube.com") || link.contains("youtu.be"))
                })
                .map(|item| VideoResult {
                    title: text(item, "title"),
                    link: text(item, "link"),
                    thumbnail: text(item, "thumbnail"),
                    description: text(item, "snippet"),
                    ..Default::default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn video(item: &Value) -> VideoResult {
    let channel = &item["channel"];
    VideoResult {
        title: text(item, "title"),
        link: text(item, "link"),
        thumbnail: text(item, "thumbnail"),
        channel: text(channel, "name"),
        channel_link: text(channel, "link"),
        date_published: text(item, "date"),
        views: scalar(&item["views"]),
        description: text(item, "description"),
        duration: text(item, "duration"),
    }
}

fn text(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

/// View counts arrive as either strings or numbers
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct Params {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

pub fn create_youtube_search_tool(ctx: &AdapterContext) -> Result<Arc<dyn Tool>> {
    let adapter = ctx.clone();
    let schema = ToolSchema::new()
        .property("query", "string", "The search query")
        .property_with_default("limit", "integer", "Maximum number of videos", json!(5))
        .required("query")
        .build();

    let tool = FunctionTool::builder()
        .name(NAME)
        .description("Search YouTube videos and return title, link, channel, views and duration")
        .schema(schema)
        .capabilities(ToolCapabilities::new(ToolKind::Search).requires_env(API_KEY_VAR))
        .execute(move |_ctx, params| {
            let adapter = adapter.clone();
            async move {
                let params: Params = parse_params(params)?;
                require_non_empty("query", &params.query)?;

                let client = SerperClient::from_context(&adapter, NAME)?;
                let response = client.videos(&params.query, "us", "en").await?;
                let videos = extract_videos(&response, params.limit);

                let result = if videos.is_empty() {
                    json!({ "videos": [], "message": NO_RESULTS_MESSAGE })
                } else {
                    json!({ "videos": videos })
                };
                Ok(ToolResponse::new(result))
            }
        })
        .build()?;

    Ok(Arc::new(tool))
}
