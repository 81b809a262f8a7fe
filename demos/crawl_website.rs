//! Crawl Website Example
//!
//! Crawls a site through Olostep and prints the aggregated markdown.
//!
//! Requires a `[crawl]` section and an Olostep key in `scout.toml`:
//!
//! ```toml
//! [crawl]
//! max_wait_secs = 300
//! poll_interval_secs = 5
//!
//! [credentials]
//! OLOSTEP_API_KEY = "${OLOSTEP_API_KEY}"
//! ```
//!
//! Then run:
//! ```bash
//! cargo run --example crawl_website -- https://example.com --max-pages 5
//! ```
//!
//! Ctrl-C cancels the crawl while it is waiting on the provider.

use clap::Parser;
use scout::web_tools::OlostepCrawlTool;
use scout::{
    init_telemetry, telemetry_options, AdapterContext, DefaultToolContext, ScoutConfig, Tool,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(about = "Crawl a website and print its pages as markdown")]
struct Args {
    /// URL where the crawl starts
    start_url: String,

    /// Maximum number of pages to crawl
    #[arg(long)]
    max_pages: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ScoutConfig::load_or_default()?;
    init_telemetry(telemetry_options(&config.observability));

    let tool = OlostepCrawlTool::new(AdapterContext::from_config(config)?);

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling crawl");
            on_interrupt.cancel();
        }
    });

    let ctx = DefaultToolContext::generated().with_cancellation(token);
    let mut params = json!({ "start_url": args.start_url });
    if let Some(max_pages) = args.max_pages {
        params["max_pages"] = json!(max_pages);
    }

    let response = tool.execute(Arc::new(ctx), params).await?;

    eprintln!(
        "Job {}: {} pages discovered, {} retrieved\n",
        response.result["job_id"].as_str().unwrap_or_default(),
        response.result["pages_discovered"],
        response.result["pages_retrieved"],
    );
    println!("{}", response.result["content"].as_str().unwrap_or_default());

    Ok(())
}
