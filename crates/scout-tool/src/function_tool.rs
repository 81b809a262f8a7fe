//! Tools assembled from an async closure
//!
//! Most provider adapters are a schema plus one request, so they are built
//! with [`FunctionTool::builder`] instead of a dedicated type. Parameters are
//! checked against the schema's `required` list before the closure runs.

use crate::params::check_required;
use crate::schema::ToolSchema;
use async_trait::async_trait;
use scout_core::{Error, Result, Tool, ToolCapabilities, ToolContext, ToolResponse};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type ExecuteFuture = Pin<Box<dyn Future<Output = Result<ToolResponse>> + Send>>;

/// Boxed body of a [`FunctionTool`]
pub type ExecuteFn = Box<dyn Fn(Arc<dyn ToolContext>, Value) -> ExecuteFuture + Send + Sync>;

pub struct FunctionTool {
    name: String,
    description: String,
    schema: Value,
    capabilities: ToolCapabilities,
    long_running: bool,
    execute_fn: ExecuteFn,
}

impl FunctionTool {
    pub fn builder() -> FunctionToolBuilder {
        FunctionToolBuilder::default()
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("long_running", &self.long_running)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        self.schema.clone()
    }

    fn capabilities(&self) -> ToolCapabilities {
        self.capabilities.clone()
    }

    fn is_long_running(&self) -> bool {
        self.long_running
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        check_required(&self.schema, &params).inspect_err(|e| {
            tracing::debug!(tool = %self.name, error = %e, "Rejected parameters");
        })?;
        (self.execute_fn)(ctx, params).await
    }
}

#[derive(Default)]
pub struct FunctionToolBuilder {
    name: Option<String>,
    description: Option<String>,
    schema: Option<Value>,
    capabilities: ToolCapabilities,
    long_running: bool,
    execute_fn: Option<ExecuteFn>,
}

impl FunctionToolBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parameter schema; defaults to an object with no properties
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn capabilities(mut self, capabilities: ToolCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn long_running(mut self, long_running: bool) -> Self {
        self.long_running = long_running;
        self
    }

    pub fn execute<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<dyn ToolContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        self.execute_fn = Some(Box::new(move |ctx, params| Box::pin(f(ctx, params))));
        self
    }

    pub fn build(self) -> Result<FunctionTool> {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::config_error("tool name is required"))?;
        let description = self
            .description
            .ok_or_else(|| Error::config_error(format!("tool '{}' has no description", name)))?;
        let execute_fn = self
            .execute_fn
            .ok_or_else(|| Error::config_error(format!("tool '{}' has no execute function", name)))?;

        Ok(FunctionTool {
            name,
            description,
            schema: self.schema.unwrap_or_else(|| ToolSchema::new().build()),
            capabilities: self.capabilities,
            long_running: self.long_running,
            execute_fn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DefaultToolContext;
    use scout_core::ToolKind;
    use serde_json::json;

    fn shout_tool() -> FunctionTool {
        FunctionTool::builder()
            .name("shout")
            .description("Upper-cases the query")
            .schema(
                ToolSchema::new()
                    .property("query", "string", "Search query")
                    .required("query")
                    .build(),
            )
            .capabilities(ToolCapabilities::new(ToolKind::Search))
            .execute(|_ctx, params| async move {
                let query = params["query"].as_str().unwrap_or_default().to_uppercase();
                Ok(ToolResponse::new(json!({ "query": query })))
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_function_tool_executes_closure() {
        let tool = shout_tool();

        assert_eq!(tool.name(), "shout");
        assert_eq!(tool.capabilities().kind, ToolKind::Search);
        assert!(!tool.is_long_running());

        let response = tool
            .execute(Arc::new(DefaultToolContext::generated()), json!({ "query": "rust" }))
            .await
            .unwrap();
        assert_eq!(response.result["query"], "RUST");
    }

    #[tokio::test]
    async fn test_missing_required_param_rejected() {
        let err = shout_tool()
            .execute(Arc::new(DefaultToolContext::generated()), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(ref msg) if msg.contains("query")));
    }

    #[test]
    fn test_builder_requires_execute_fn() {
        let err = FunctionTool::builder()
            .name("incomplete")
            .description("No body")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_default_schema_is_empty_object() {
        let tool = FunctionTool::builder()
            .name("noop")
            .description("Does nothing")
            .execute(|_ctx, _params| async move { Ok(ToolResponse::new(Value::Null)) })
            .build()
            .unwrap();
        assert_eq!(tool.schema()["type"], "object");
    }
}
