//! Core traits and types for Scout
//!
//! This crate provides the foundational abstractions shared by every tool adapter:
//! the [`Tool`] trait and its capability descriptor, the error taxonomy, credential
//! resolution, configuration loading and the retrying HTTP client.

pub mod adapter;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod http;
pub mod traits;

// Re-exports
pub use adapter::AdapterContext;
pub use capabilities::{Dependency, ToolCapabilities, ToolKind};
pub use config::{CrawlSettings, HttpSettings, ObservabilityConfig, RetrySettings, ScoutConfig};
pub use context::ToolContext;
pub use credentials::{CredentialResolver, CredentialSource};
pub use error::{Error, Result};
pub use http::{HttpClient, RetryPolicy};
pub use traits::{Tool, ToolResponse};
