//! YouTube video metadata, captions and timestamped transcripts
//!
//! Metadata comes from the public oEmbed endpoint. Captions are read from the
//! caption tracks advertised on the watch page and fetched as timed-text XML,
//! which needs the `youtube` feature.

use regex::Regex;
use scout_core::{AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{parse_params, require_non_empty, FunctionTool, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
pub const DEFAULT_OEMBED_URL: &str = "https://www.youtube.com/oembed";

const SERVICE: &str = "youtube";
const OEMBED_SERVICE: &str = "youtube_oembed";

const VIDEO_ID_PATTERN: &str =
    r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#;

/// Pull the video id out of any of the common YouTube URL shapes
pub fn extract_video_id(url: &str) -> Result<String> {
    if let Some(id) = video_id_from_url(url) {
        return Ok(id);
    }

    let pattern = Regex::new(VIDEO_ID_PATTERN)
        .map_err(|e| Error::message(format!("Invalid video id pattern: {}", e)))?;
    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| Error::invalid_params(format!("Could not extract video ID from URL '{}'", url)))
}

fn video_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;

    let id = match parsed.host_str()? {
        "youtu.be" => segments.next()?.to_string(),
        "www.youtube.com" | "youtube.com" | "m.youtube.com" => match segments.next()? {
            "watch" => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, v)| v.into_owned())?,
            "embed" | "v" | "shorts" => segments.next()?.to_string(),
            _ => return None,
        },
        _ => return None,
    };

    (!id.is_empty()).then_some(id)
}

/// `H:MM:SS` past the hour, `M:SS` below it
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: Option<String>,
    author_name: Option<String>,
    author_url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    height: Option<u32>,
    width: Option<u32>,
    version: Option<String>,
    provider_name: Option<String>,
    provider_url: Option<String>,
    thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoData {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub version: Option<String>,
    pub provider_name: Option<String>,
    pub provider_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_id: String,
    pub video_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptLine {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Caption text joined into one paragraph
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn timestamps(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{} - {}", format_timestamp(line.start), line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: HttpClient,
    base_url: String,
    oembed_url: String,
}

impl YouTubeClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, oembed_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            oembed_url: oembed_url.into(),
        }
    }

    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self::new(
            ctx.http().clone(),
            ctx.endpoint(SERVICE, DEFAULT_BASE_URL),
            ctx.endpoint(OEMBED_SERVICE, DEFAULT_OEMBED_URL),
        )
    }

    pub async fn video_data(&self, url: &str) -> Result<VideoData> {
        let video_id = extract_video_id(url)?;
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);

        let oembed: OEmbed = self
            .http
            .json(OEMBED_SERVICE, |c| {
                c.get(&self.oembed_url)
                    .query(&[("format", "json"), ("url", video_url.as_str())])
            })
            .await?;

        Ok(VideoData {
            title: oembed.title,
            author_name: oembed.author_name,
            author_url: oembed.author_url,
            kind: oembed.kind,
            height: oembed.height,
            width: oembed.width,
            version: oembed.version,
            provider_name: oembed.provider_name,
            provider_url: oembed.provider_url,
            thumbnail_url: oembed.thumbnail_url,
            video_id,
            video_url,
        })
    }

    /// Transcript in the first requested language that has captions.
    ///
    /// Uploaded captions are preferred over generated ones for the same language.
    pub async fn transcript(&self, url: &str, languages: &[String]) -> Result<Transcript> {
        let video_id = extract_video_id(url)?;
        if !cfg!(feature = "youtube") {
            return Err(missing_feature());
        }

        let watch_url = format!("{}/watch", self.base_url);
        let page = self
            .http
            .send_checked(SERVICE, |c| {
                c.get(&watch_url)
                    .query(&[("v", video_id.as_str()), ("hl", "en")])
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            })
            .await?
            .text()
            .await?;

        let tracks = caption_tracks(&page)?;
        let track = select_track(&tracks, languages).ok_or_else(|| {
            let available: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
            Error::NotFound(format!(
                "No captions for video {} in [{}]; available: [{}]",
                video_id,
                languages.join(", "),
                available.join(", ")
            ))
        })?;
        tracing::debug!(
            video_id = %video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "Fetching captions"
        );

        let xml = self
            .http
            .send_checked(SERVICE, |c| c.get(&track.base_url))
            .await?
            .text()
            .await?;

        Ok(Transcript {
            video_id,
            language: track.language_code.clone(),
            lines: timed_text::parse(&xml)?,
        })
    }
}

fn missing_feature() -> Error {
    Error::MissingDependency {
        tool: "youtube".to_string(),
        dependency: "youtube".to_string(),
    }
}

/// Caption tracks embedded in the watch page's player response
fn caption_tracks(page: &str) -> Result<Vec<CaptionTrack>> {
    const MARKER: &str = "\"captionTracks\":";

    let Some(start) = page.find(MARKER) else {
        return Ok(Vec::new());
    };
    serde_json::Deserializer::from_str(&page[start + MARKER.len()..])
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .unwrap_or_else(|| Ok(Vec::new()))
        .map_err(|e| Error::protocol(SERVICE, format!("invalid caption track list: {}", e)))
}

fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let matching = || tracks.iter().filter(|t| t.language_code == *lang);
        matching()
            .find(|t| !t.is_generated())
            .or_else(|| matching().next())
    })
}

#[cfg(feature = "youtube")]
mod timed_text {
    use super::TranscriptLine;
    use scout_core::{Error, Result};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Document {
        #[serde(rename = "text", default)]
        lines: Vec<Line>,
    }

    #[derive(Debug, Deserialize)]
    struct Line {
        #[serde(rename = "@start")]
        start: f64,
        #[serde(rename = "@dur", default)]
        duration: f64,
        #[serde(rename = "$text", default)]
        text: String,
    }

    pub(super) fn parse(xml: &str) -> Result<Vec<TranscriptLine>> {
        let document: Document = quick_xml::de::from_str(xml)
            .map_err(|e| Error::protocol("youtube", format!("invalid timed-text document: {}", e)))?;

        Ok(document
            .lines
            .into_iter()
            .filter_map(|line| {
                // Caption text is HTML-escaped a second time inside the XML
                let text = quick_xml::escape::unescape(&line.text)
                    .map(|t| t.into_owned())
                    .unwrap_or(line.text);
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                (!text.is_empty()).then_some(TranscriptLine {
                    start: line.start,
                    duration: line.duration,
                    text,
                })
            })
            .collect())
    }
}

#[cfg(not(feature = "youtube"))]
mod timed_text {
    use super::TranscriptLine;
    use scout_core::Result;

    pub(super) fn parse(_xml: &str) -> Result<Vec<TranscriptLine>> {
        Err(super::missing_feature())
    }
}

#[derive(Debug, Deserialize)]
struct VideoParams {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptParams {
    url: String,
    #[serde(default)]
    languages: Vec<String>,
}

impl TranscriptParams {
    fn languages(&self) -> Vec<String> {
        if self.languages.is_empty() {
            vec!["en".to_string()]
        } else {
            self.languages.clone()
        }
    }
}

fn transcript_schema() -> serde_json::Value {
    ToolSchema::new()
        .property("url", "string", "The URL of the YouTube video")
        .array_property("languages", "string", "Language codes to try in order (default: [\"en\"])")
        .required("url")
        .build()
}

/// `youtube_video_data`, `youtube_captions` and `youtube_timestamps`
pub fn create_youtube_video_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    let client = YouTubeClient::from_context(ctx);
    let transcript_caps =
        ToolCapabilities::new(ToolKind::Data).depends_on("youtube", cfg!(feature = "youtube"));

    let video_data = {
        let client = client.clone();
        FunctionTool::builder()
            .name("youtube_video_data")
            .description("Get metadata for a YouTube video: title, channel, thumbnail and embed dimensions")
            .schema(
                ToolSchema::new()
                    .property("url", "string", "The URL of the YouTube video")
                    .required("url")
                    .build(),
            )
            .capabilities(ToolCapabilities::new(ToolKind::Data))
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: VideoParams = parse_params(params)?;
                    require_non_empty("url", &params.url)?;
                    ToolResponse::from_serializable(&client.video_data(&params.url).await?)
                }
            })
            .build()?
    };

    let captions = {
        let client = client.clone();
        FunctionTool::builder()
            .name("youtube_captions")
            .description("Get the caption text of a YouTube video as one paragraph")
            .schema(transcript_schema())
            .capabilities(transcript_caps.clone())
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: TranscriptParams = parse_params(params)?;
                    require_non_empty("url", &params.url)?;
                    let transcript = client.transcript(&params.url, &params.languages()).await?;
                    Ok(ToolResponse::new(json!({
                        "video_id": transcript.video_id,
                        "language": transcript.language,
                        "captions": transcript.text(),
                    })))
                }
            })
            .build()?
    };

    let timestamps = FunctionTool::builder()
        .name("youtube_timestamps")
        .description("Get a YouTube video's captions as timestamped lines ('M:SS - text')")
        .schema(transcript_schema())
        .capabilities(transcript_caps)
        .execute(move |_ctx, params| {
            let client = client.clone();
            async move {
                let params: TranscriptParams = parse_params(params)?;
                require_non_empty("url", &params.url)?;
                let transcript = client.transcript(&params.url, &params.languages()).await?;
                Ok(ToolResponse::new(json!({
                    "video_id": transcript.video_id,
                    "language": transcript.language,
                    "timestamps": transcript.timestamps(),
                })))
            }
        })
        .build()?;

    Ok(vec![Arc::new(video_data), Arc::new(captions), Arc::new(timestamps)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use scout_core::HttpSettings;

    fn client(server: &mockito::Server) -> YouTubeClient {
        YouTubeClient::new(
            HttpClient::new(&HttpSettings::default()).unwrap(),
            server.url(),
            format!("{}/oembed", server.url()),
        )
    }

    #[test]
    fn test_extract_video_id_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://m.youtube.com/shorts/dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(url).unwrap(), "dQw4w9WgXcQ", "{url}");
        }
    }

    #[test]
    fn test_extract_video_id_failure() {
        let err = extract_video_id("https://vimeo.com/12345").unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.4), "0:00");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
    }

    #[test]
    fn test_select_track_prefers_uploaded_captions() {
        let tracks = vec![
            CaptionTrack {
                base_url: "asr".into(),
                language_code: "en".into(),
                kind: Some("asr".into()),
            },
            CaptionTrack {
                base_url: "manual".into(),
                language_code: "en".into(),
                kind: None,
            },
            CaptionTrack {
                base_url: "de".into(),
                language_code: "de".into(),
                kind: None,
            },
        ];

        let langs = vec!["fr".to_string(), "en".to_string()];
        assert_eq!(select_track(&tracks, &langs).unwrap().base_url, "manual");
        assert!(select_track(&tracks, &["fr".to_string()]).is_none());
    }

    #[tokio::test]
    async fn test_video_data_from_oembed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/oembed")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded(
                    "url".into(),
                    "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
                ),
            ]))
            .with_status(200)
            .with_body(
                r#"{"title": "Never Gonna Give You Up", "author_name": "Rick Astley",
                    "type": "video", "height": 113, "width": 200, "version": "1.0",
                    "provider_name": "YouTube"}"#,
            )
            .create_async()
            .await;

        let data = client(&server)
            .video_data("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(data.title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(data.kind.as_deref(), Some("video"));
        assert_eq!(data.video_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[cfg(feature = "youtube")]
    #[tokio::test]
    async fn test_transcript_and_timestamps() {
        let mut server = mockito::Server::new_async().await;
        let page = format!(
            r#"<html><script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{}/api/timedtext?v=dQw4w9WgXcQ&lang=en","languageCode":"en","kind":"asr"}}],"audioTracks":[]}}}}}};</script></html>"#,
            server.url()
        );
        server
            .mock("GET", "/watch")
            .match_query(Matcher::UrlEncoded("v".into(), "dQw4w9WgXcQ".into()))
            .with_status(200)
            .with_body(page)
            .create_async()
            .await;
        server
            .mock("GET", "/api/timedtext")
            .match_query(Matcher::UrlEncoded("lang".into(), "en".into()))
            .with_status(200)
            .with_body(
                r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="1.2" dur="2.5">We&amp;#39;re no strangers</text><text start="3725" dur="1">to love</text><text start="3730" dur="1"></text></transcript>"#,
            )
            .create_async()
            .await;

        let transcript = client(&server)
            .transcript("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &["en".to_string()])
            .await
            .unwrap();

        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.lines.len(), 2);
        assert_eq!(transcript.text(), "We're no strangers to love");
        assert_eq!(transcript.timestamps(), "0:01 - We're no strangers\n1:02:05 - to love");
    }

    #[cfg(feature = "youtube")]
    #[tokio::test]
    async fn test_transcript_without_captions_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/watch")
            .with_status(200)
            .with_body("<html>no player response</html>")
            .create_async()
            .await;

        let err = client(&server)
            .transcript("https://youtu.be/dQw4w9WgXcQ", &["en".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
    }
}
