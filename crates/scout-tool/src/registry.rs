//! Name-indexed collection of tools
//!
//! The registry is how orchestration code enumerates tools, checks that their
//! credentials and build features are present, and invokes them by name.

use scout_core::{
    CredentialResolver, Error, Result, Tool, ToolContext, ToolKind, ToolResponse,
};
use scout_telemetry::{safe_serialize, trace_tool_call, ToolSpanAttributes};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Serializable summary of a registered tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,
    pub long_running: bool,
    pub required_env: Vec<&'static str>,
    pub dependencies: BTreeMap<&'static str, bool>,
    pub parameters: Value,
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    credentials: CredentialResolver,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver used by [`validate`](Self::validate); normally the one the
    /// tools themselves were built with
    pub fn with_credentials(mut self, credentials: CredentialResolver) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    /// Add a tool; names must be unique
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(Error::config_error(format!(
                "tool '{}' is already registered",
                name
            )));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn register_all<I>(&mut self, tools: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names in lexical order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn by_kind(&self, kind: ToolKind) -> Vec<Arc<dyn Tool>> {
        self.tools
            .values()
            .filter(|tool| tool.capabilities().kind == kind)
            .cloned()
            .collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|tool| describe(tool.as_ref())).collect()
    }

    /// Check every tool's dependencies and credentials against the
    /// registry's own resolver.
    ///
    /// Returns the tools that cannot run, keyed by name.
    pub fn validate(&self) -> BTreeMap<String, Error> {
        self.validate_with(&self.credentials)
    }

    /// Like [`validate`](Self::validate) but against another resolver
    pub fn validate_with(&self, resolver: &CredentialResolver) -> BTreeMap<String, Error> {
        self.tools
            .iter()
            .filter_map(|(name, tool)| {
                tool.capabilities()
                    .check(name, resolver)
                    .err()
                    .map(|e| (name.clone(), e))
            })
            .collect()
    }

    /// Execute a tool by name and record a span for the call
    pub async fn invoke(
        &self,
        name: &str,
        ctx: Arc<dyn ToolContext>,
        params: Value,
    ) -> Result<ToolResponse> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let args_json = safe_serialize(&params);
        let call_id = ctx.function_call_id().to_string();
        let invocation_id = ctx.invocation_id().to_string();

        tracing::info!(tool = name, call_id = %call_id, "Invoking tool");
        let result = tool.execute(ctx, params).await;

        let (response_json, outcome) = match &result {
            Ok(response) => (safe_serialize(&response.result), "ok".to_string()),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool execution failed");
                (String::new(), e.to_string())
            }
        };

        trace_tool_call(ToolSpanAttributes {
            tool_name: name.to_string(),
            tool_description: tool.description().to_string(),
            tool_kind: tool.capabilities().kind.to_string(),
            tool_call_id: call_id,
            invocation_id,
            args_json,
            response_json,
            outcome,
        });

        result
    }
}

fn describe(tool: &dyn Tool) -> ToolDescriptor {
    let capabilities = tool.capabilities();

    ToolDescriptor {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        kind: capabilities.kind,
        long_running: tool.is_long_running(),
        dependencies: capabilities.analyze_dependencies(),
        required_env: capabilities.required_env,
        parameters: tool.schema(),
    }
}
