//! Error handling utilities for MCP server

use rmcp::ErrorData;
use sitesmith_core::BuildError;

/// Converts a pipeline error into an MCP error. Retryable model failures
/// say so, so that the calling assistant can try again.
pub fn to_mcp_error(message: &str, error: &BuildError) -> ErrorData {
    let hint = if error.is_retryable() {
        " (retryable)"
    } else {
        ""
    };
    ErrorData::internal_error(format!("{message}: {error}{hint}"), None)
}
