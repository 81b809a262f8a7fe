//! # Scout Telemetry
//!
//! Structured logging and OpenTelemetry tracing for tool executions.
//!
//! Call [`init_telemetry`] once at startup; tool registries then record an
//! `execute_tool` span per invocation through [`trace_tool_call`].

mod spans;
mod tracer;

pub use spans::{safe_serialize, trace_tool_call, ToolSpanAttributes};
pub use tracer::{init_telemetry, register_span_processor, tracer_provider, TelemetryOptions};

/// OpenTelemetry span attribute names used by Scout.
///
/// Tool attributes follow the OpenTelemetry semantic conventions for generative AI.
pub mod attributes {
    pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
    pub const GEN_AI_SYSTEM: &str = "gen_ai.system";

    // Tool-specific attributes
    pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";
    pub const GEN_AI_TOOL_DESCRIPTION: &str = "gen_ai.tool.description";
    pub const GEN_AI_TOOL_CALL_ID: &str = "gen_ai.tool.call.id";

    pub const SCOUT_TOOL_KIND: &str = "scout.tool.kind";
    pub const SCOUT_INVOCATION_ID: &str = "scout.invocation_id";
    pub const SCOUT_TOOL_CALL_ARGS: &str = "scout.tool_call_args";
    pub const SCOUT_TOOL_RESPONSE: &str = "scout.tool_response";
    pub const SCOUT_TOOL_OUTCOME: &str = "scout.tool_outcome";

    pub const SYSTEM_NAME: &str = "scout";
}
