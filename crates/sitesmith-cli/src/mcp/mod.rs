//! MCP server for Sitesmith
//!
//! Exposes one build session to MCP clients over stdio. Tools delegate to
//! [`handlers::McpHandlers`]; the session serialises prompts itself, so the
//! server shares it without an outer lock.

use std::{future::Future, sync::Arc};

use anyhow::Result;
use log::{debug, error, info};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use sitesmith_core::Session;
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;

pub use handlers::{
    ExportProject, FollowUp, ListSteps, McpResult, ShowFile, StartBuild, SubmitResponse,
};

/// MCP server for Sitesmith
#[derive(Clone)]
pub struct SitesmithMcpServer {
    session: Arc<Session>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SitesmithMcpServer {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
            tool_router: Self::tool_router(),
        }
    }

    fn handlers(&self) -> handlers::McpHandlers {
        handlers::McpHandlers::new(self.session.clone())
    }

    #[tool(
        name = "start_build",
        description = "Start a new project from a description. Picks a template (node or react), asks the model for the project and folds the files into a fresh file tree. Discards any previous build. Returns the artifact title, step counts and preview state."
    )]
    async fn start_build(&self, params: Parameters<StartBuild>) -> McpResult {
        self.handlers().start_build(params).await
    }

    #[tool(
        name = "follow_up",
        description = "Ask for a change to the current project. The whole conversation so far is sent along, and files in the reply overwrite files with the same path. On failure nothing changes and the call can be retried."
    )]
    async fn follow_up(&self, params: Parameters<FollowUp>) -> McpResult {
        self.handlers().follow_up(params).await
    }

    #[tool(
        name = "submit_response",
        description = "Fold a model reply obtained elsewhere into the current project. The reply must contain an <artifact> element with <action type=\"file\" filePath=\"...\"> and <action type=\"shell\"> children. Does not change the conversation."
    )]
    async fn submit_response(&self, params: Parameters<SubmitResponse>) -> McpResult {
        self.handlers().submit_response(params).await
    }

    #[tool(
        name = "list_steps",
        description = "List every step parsed so far in order, with status (pending, completed, error), paths or commands, and rejection reasons. Filter with status to show only one kind."
    )]
    async fn list_steps(&self, params: Parameters<ListSteps>) -> McpResult {
        self.handlers().list_steps(params).await
    }

    #[tool(
        name = "list_files",
        description = "Show the project file tree as an indented outline with file sizes."
    )]
    async fn list_files(&self) -> McpResult {
        self.handlers().list_files().await
    }

    #[tool(
        name = "show_file",
        description = "Show the content of a file, or the children of a folder, by path (e.g. src/App.tsx)."
    )]
    async fn show_file(&self, params: Parameters<ShowFile>) -> McpResult {
        self.handlers().show_file(params).await
    }

    #[tool(
        name = "mount_descriptor",
        description = "Return the nested JSON mount descriptor of the current tree, as handed to the preview sandbox."
    )]
    async fn mount_descriptor(&self) -> McpResult {
        self.handlers().mount_descriptor().await
    }

    #[tool(
        name = "export_project",
        description = "Write the project as a zip archive. Uses output if given, otherwise the default export path. Returns the file, folder and byte counts."
    )]
    async fn export_project(&self, params: Parameters<ExportProject>) -> McpResult {
        self.handlers().export_project(params).await
    }

    #[tool(
        name = "preview_status",
        description = "Show the live preview state (unavailable, mounted, starting, ready with URL, failed) and the latest sandbox output."
    )]
    async fn preview_status(&self) -> McpResult {
        self.handlers().preview_status().await
    }

    #[tool(
        name = "start_preview",
        description = "Install dependencies and start the dev server in the sandbox. Waits until the server reports a URL or fails. Safe to call again after a failure."
    )]
    async fn start_preview(&self) -> McpResult {
        self.handlers().start_preview().await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for SitesmithMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sitesmith".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(r#"Sitesmith builds small web projects from a description.

## Workflow
1. `start_build` with a description of the site. A template is chosen and the model's files are folded into a file tree.
2. `follow_up` to request changes. Later files with the same path replace earlier ones.
3. `list_files` and `show_file` to inspect the result, `list_steps` to see what each reply did.
4. `start_preview` and `preview_status` to run the dev server when a sandbox is configured.
5. `export_project` to write a zip.

## Offline use
`submit_response` folds a reply you already have, without calling the model."#.to_string()),
        }
    }
}

/// Run the MCP server with stdio transport
pub async fn run_stdio_server(server: SitesmithMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting Sitesmith MCP server on stdio");
    debug!(
        "Server created with {} tools",
        server.tool_router.list_all().len()
    );

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
    }

    info!("MCP server shutdown complete");
    Ok(())
}
