//! Tool system for Scout
//!
//! This crate provides the tool execution framework, including:
//! - Function tools built from async closures
//! - Parameter schemas (manual builder or derived via `schemars`)
//! - Tool context with cancellation
//! - A registry to enumerate, validate and invoke tools by name

pub mod context;
pub mod function_tool;
pub mod params;
pub mod registry;
pub mod schema;

// Re-exports
pub use context::DefaultToolContext;
pub use function_tool::FunctionTool;
pub use params::{check_required, parse_params, require_non_empty};
pub use registry::{ToolDescriptor, ToolRegistry};
pub use schema::{generate_schema, ToolSchema};

// Re-export core types
pub use scout_core::{Result, Tool, ToolCapabilities, ToolContext, ToolKind, ToolResponse};
