//! Shared type definitions for the tool system.

pub mod schema;
pub mod tool;

pub use schema::{ParamKind, ParamSchema, ParamSpec};
pub use tool::{
    ContentBlock, DeltaSink, InvocationContext, Tool, ToolCallback, ToolOutcome, ToolOutput,
    ToolSpec,
};
