mod mcp_error;
mod tool_error;

pub use mcp_error::ErrorCode;
pub use tool_error::{ToolError, ToolErrorKind};
