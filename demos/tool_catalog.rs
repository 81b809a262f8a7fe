//! Tool Catalog Example
//!
//! Lists every tool Scout provides, reports which ones cannot run in the
//! current environment, and optionally invokes one by name.
//!
//! Credentials come from `scout.toml`, the process environment or a `.env`
//! file:
//!
//! ```toml
//! [credentials]
//! SERPER_API_KEY = "${SERPER_API_KEY}"
//! ```
//!
//! Then run:
//! ```bash
//! cargo run --example tool_catalog
//! cargo run --example tool_catalog -- --kind search
//! cargo run --example tool_catalog -- --invoke wikipedia_summary --params '{"query": "Rust"}'
//! ```

use clap::{Parser, ValueEnum};
use scout::{
    init_telemetry, registry_from_config, telemetry_options, DefaultToolContext, ScoutConfig,
    ToolKind,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Search,
    Scrape,
    Data,
}

impl From<Kind> for ToolKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Search => ToolKind::Search,
            Kind::Scrape => ToolKind::Scrape,
            Kind::Data => ToolKind::Data,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "List and invoke Scout tools")]
struct Args {
    /// Only list tools of this kind
    #[arg(long, value_enum)]
    kind: Option<Kind>,

    /// Print descriptors as JSON
    #[arg(long)]
    json: bool,

    /// Name of a tool to invoke
    #[arg(long)]
    invoke: Option<String>,

    /// JSON parameters for --invoke
    #[arg(long, default_value = "{}")]
    params: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ScoutConfig::load_or_default()?;
    init_telemetry(telemetry_options(&config.observability));

    let registry = registry_from_config(config)?;

    if let Some(name) = &args.invoke {
        let params: serde_json::Value = serde_json::from_str(&args.params)?;
        let response = registry
            .invoke(name, Arc::new(DefaultToolContext::generated()), params)
            .await?;
        println!("{}", serde_json::to_string_pretty(&response.result)?);
        return Ok(());
    }

    let descriptors: Vec<_> = registry
        .descriptors()
        .into_iter()
        .filter(|d| args.kind.is_none_or(|kind| d.kind == ToolKind::from(kind)))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    println!("Scout tools ({})", descriptors.len());
    println!("================\n");

    let problems = registry.validate();
    for descriptor in &descriptors {
        let status = match problems.get(&descriptor.name) {
            Some(e) => format!("unavailable: {}", e),
            None => "ready".to_string(),
        };
        let long_running = if descriptor.long_running { " (long running)" } else { "" };
        println!("  {:<28} {:?}{}  [{}]", descriptor.name, descriptor.kind, long_running, status);
    }

    Ok(())
}
