//! Scout: search, scrape and data tool adapters
//!
//! This crate ties the workspace together. It builds every tool from one
//! [`ScoutConfig`] and hands them out as a [`ToolRegistry`] that orchestration
//! code can enumerate, validate and invoke by name.
//!
//! ```rust,no_run
//! use scout::{registry_from_config, ScoutConfig};
//!
//! # fn main() -> scout::Result<()> {
//! let config = ScoutConfig::load_or_default()?;
//! let registry = registry_from_config(config)?;
//! for name in registry.names() {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

pub use scout_core::{
    AdapterContext, CredentialResolver, Error, ObservabilityConfig, Result, ScoutConfig, Tool,
    ToolCapabilities, ToolContext, ToolKind, ToolResponse,
};
pub use scout_data_tools::create_data_tools;
pub use scout_telemetry::{init_telemetry, TelemetryOptions};
pub use scout_tool::{DefaultToolContext, ToolDescriptor, ToolRegistry};
pub use scout_web_tools::create_web_tools;

pub mod data_tools {
    pub use scout_data_tools::*;
}

pub mod web_tools {
    pub use scout_web_tools::*;
}

use std::sync::Arc;

/// Every tool the workspace provides, web tools first
pub fn catalog(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools = create_web_tools(ctx)?;
    tools.extend(create_data_tools(ctx)?);
    Ok(tools)
}

pub fn build_registry(ctx: &AdapterContext) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new().with_credentials(ctx.credentials().clone());
    registry.register_all(catalog(ctx)?)?;
    tracing::info!(tools = registry.len(), "Tool registry ready");
    Ok(registry)
}

/// Registry over a config whose `[credentials]` table seeds the resolver
pub fn registry_from_config(config: ScoutConfig) -> Result<ToolRegistry> {
    build_registry(&AdapterContext::from_config(config)?)
}

/// Logging options taken from the `[observability]` section
pub fn telemetry_options(config: &ObservabilityConfig) -> TelemetryOptions {
    TelemetryOptions {
        json: config.json_logs,
        default_filter: config.log_filter.clone(),
    }
}
