//! Data tools for Scout
//!
//! Market data, academic papers and video metadata:
//!
//! - **Yahoo Finance**: quotes, price history, annual statements and symbol search
//! - **arXiv**: paper search, lookup by id, PDF download and reading
//!   (`arxiv` feature; reading also needs `pdf`)
//! - **YouTube**: video metadata, captions and timestamped transcripts
//!   (captions need the `youtube` feature)
//!
//! None of these providers need an API key.

pub mod arxiv;
pub mod yfinance;
pub mod youtube_video;

pub use arxiv::{create_arxiv_tools, ArxivClient, Paper, PaperText, SortBy, SortOrder};
pub use yfinance::{create_yfinance_tools, YahooFinanceClient};
pub use youtube_video::{create_youtube_video_tools, extract_video_id, format_timestamp, YouTubeClient};

use scout_core::{AdapterContext, Result, Tool};
use std::sync::Arc;

/// Every finance, paper and video tool in this crate
pub fn create_data_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools = create_yfinance_tools(ctx)?;
    tools.extend(create_arxiv_tools(ctx)?);
    tools.extend(create_youtube_video_tools(ctx)?);
    Ok(tools)
}
