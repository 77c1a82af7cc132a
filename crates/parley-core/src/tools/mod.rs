pub mod date;
pub mod registry;
pub mod schema;
pub mod spec;
pub mod tool;

pub use date::GetDateTool;
pub use registry::ToolRegistry;
pub use spec::{AnnotatedTool, BareTool, ToolDescriptor, ToolSpec};
pub use tool::{
    Callable, CustomIdentifier, ParamSpec, ParamType, Tool, ToolArgs, ToolContext, ToolDef,
    ToolResult,
};
