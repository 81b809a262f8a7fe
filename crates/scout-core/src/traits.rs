use crate::{Result, ToolCapabilities, ToolContext};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Tool trait - abstraction for callable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool
    fn name(&self) -> &str;

    /// Returns a description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's parameters
    fn schema(&self) -> serde_json::Value;

    /// Kind, required credentials and build dependencies
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::default()
    }

    /// Indicates whether this is a long-running tool
    fn is_long_running(&self) -> bool {
        false
    }

    /// Executes the tool with given parameters
    async fn execute(
        &self,
        ctx: Arc<dyn ToolContext>,
        params: serde_json::Value,
    ) -> Result<ToolResponse>;
}

/// Tool execution response
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub result: serde_json::Value,
}

impl ToolResponse {
    pub fn new(result: serde_json::Value) -> Self {
        Self { result }
    }

    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            result: serde_json::to_value(value)?,
        })
    }
}
