//! MCP tool handlers implementation

use std::sync::Arc;

use log::debug;
use rmcp::{
    handler::server::tool::Parameters,
    model::{CallToolResult, Content},
    ErrorData,
};
use schemars::JsonSchema;
use serde::Deserialize;
use sitesmith_core::{
    display::{ExportResult, FileListing, OperationStatus, Steps},
    params as core, Session,
};

use super::errors::to_mcp_error;

/// Generic MCP wrapper for core parameter types.
///
/// `#[serde(transparent)]` passes deserialisation straight through to the
/// wrapped core type; the schema is the core type's schema.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct McpParams<T>(T)
where
    T: JsonSchema;

impl<T> JsonSchema for McpParams<T>
where
    T: JsonSchema,
{
    fn schema_name() -> std::borrow::Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(g: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(g)
    }
}

impl<T> AsRef<T> for McpParams<T>
where
    T: JsonSchema,
{
    fn as_ref(&self) -> &T {
        &self.0
    }
}

pub type StartBuild = McpParams<core::StartBuild>;
pub type FollowUp = McpParams<core::FollowUp>;
pub type SubmitResponse = McpParams<core::SubmitResponse>;
pub type ListSteps = McpParams<core::ListSteps>;
pub type ShowFile = McpParams<core::ShowFile>;
pub type ExportProject = McpParams<core::ExportProject>;

pub type McpResult = Result<CallToolResult, ErrorData>;

fn text(body: impl Into<String>) -> McpResult {
    Ok(CallToolResult::success(vec![Content::text(body.into())]))
}

/// Handler implementations for the MCP server
pub struct McpHandlers {
    session: Arc<Session>,
}

impl McpHandlers {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn start_build(&self, Parameters(params): Parameters<StartBuild>) -> McpResult {
        debug!("start_build: {:?}", params);
        let outcome = self
            .session
            .start(&params.as_ref().prompt)
            .await
            .map_err(|e| to_mcp_error("Failed to start build", &e))?;
        text(outcome.to_string())
    }

    pub async fn follow_up(&self, Parameters(params): Parameters<FollowUp>) -> McpResult {
        debug!("follow_up: {:?}", params);
        let outcome = self
            .session
            .follow_up(&params.as_ref().prompt)
            .await
            .map_err(|e| to_mcp_error("Failed to apply follow-up", &e))?;
        text(outcome.to_string())
    }

    pub async fn submit_response(
        &self,
        Parameters(params): Parameters<SubmitResponse>,
    ) -> McpResult {
        debug!("submit_response: {} bytes", params.as_ref().response.len());
        let outcome = self.session.submit_response(&params.as_ref().response).await;
        text(outcome.to_string())
    }

    pub async fn list_steps(&self, Parameters(params): Parameters<ListSteps>) -> McpResult {
        debug!("list_steps: {:?}", params);
        let steps = params.as_ref().filter(self.session.steps().await);
        let title = match &params.as_ref().status {
            Some(status) => format!("Steps ({status})"),
            None => "Steps".to_string(),
        };
        text(format!("# {title}\n\n{}", Steps(steps)))
    }

    pub async fn list_files(&self) -> McpResult {
        let tree = self.session.tree().await;
        text(format!(
            "# Files\n\n{}\n{} files in {} folders\n",
            FileListing(&tree),
            tree.file_count(),
            tree.folder_count()
        ))
    }

    pub async fn show_file(&self, Parameters(params): Parameters<ShowFile>) -> McpResult {
        debug!("show_file: {:?}", params);
        let path = &params.as_ref().path;
        let node = self.session.file(path).await.ok_or_else(|| {
            ErrorData::invalid_params(format!("No file or folder at '{path}'"), None)
        })?;
        text(node.to_string())
    }

    pub async fn mount_descriptor(&self) -> McpResult {
        let descriptor = self.session.mount_descriptor().await;
        let json = descriptor
            .to_json()
            .map_err(|e| to_mcp_error("Failed to serialise mount descriptor", &e))?;
        text(format!("```json\n{json}\n```\n"))
    }

    pub async fn export_project(
        &self,
        Parameters(params): Parameters<ExportProject>,
    ) -> McpResult {
        debug!("export_project: {:?}", params);
        let path = params
            .as_ref()
            .output
            .as_ref()
            .map_or_else(|| self.session.export_path().to_path_buf(), Into::into);
        let summary = self
            .session
            .export_to(&path)
            .await
            .map_err(|e| to_mcp_error("Failed to export project", &e))?;
        let result = ExportResult::new(path, summary).to_string();
        text(OperationStatus::success(result.trim_end()).to_string())
    }

    pub async fn preview_status(&self) -> McpResult {
        let state = self.session.preview_state();
        let mut body = format!("# Preview\n\n{state}\n");
        let output = self.session.preview_output(20);
        if !output.is_empty() {
            body.push_str("\n```text\n");
            for line in output {
                body.push_str(&line);
                body.push('\n');
            }
            body.push_str("```\n");
        }
        text(body)
    }

    pub async fn start_preview(&self) -> McpResult {
        let state = self.session.start_preview().await;
        text(format!("# Preview\n\n{state}\n"))
    }
}

#[cfg(test)]
mod tests {
    use sitesmith_core::SessionBuilder;
    use tempfile::TempDir;

    use super::*;

    const REPLY: &str = r#"Sure.
<artifact id="site" title="Site">
<action type="file" filePath="index.html"><h1>Hi</h1></action>
<action type="file" filePath="src/main.js">console.log(1)</action>
</artifact>"#;

    fn params<T: JsonSchema + serde::de::DeserializeOwned>(json: &str) -> Parameters<McpParams<T>> {
        Parameters(serde_json::from_str(json).expect("Failed to parse params"))
    }

    fn body(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    async fn create_test_handlers() -> (TempDir, McpHandlers) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let session = SessionBuilder::new()
            .with_export_path(Some(temp_dir.path().join("project.zip")))
            .build()
            .await
            .expect("Failed to create session");
        (temp_dir, McpHandlers::new(Arc::new(session)))
    }

    #[tokio::test]
    async fn test_submit_then_inspect() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let result = handlers
            .submit_response(params(&serde_json::json!({ "response": REPLY }).to_string()))
            .await
            .expect("Failed to submit response");
        assert!(body(&result).contains("## Site"));

        let files = body(&handlers.list_files().await.expect("Failed to list files"));
        assert!(files.contains("- index.html (11 B)"));
        assert!(files.contains("2 files in 1 folders"));

        let file = handlers
            .show_file(params(r#"{"path":"src/main.js"}"#))
            .await
            .expect("Failed to show file");
        assert!(body(&file).contains("console.log(1)"));

        let steps = handlers
            .list_steps(params(r#"{"status":"completed"}"#))
            .await
            .expect("Failed to list steps");
        assert!(body(&steps).starts_with("# Steps (completed)"));

        let mount = handlers
            .mount_descriptor()
            .await
            .expect("Failed to get descriptor");
        assert!(body(&mount).contains("\"index.html\""));
    }

    #[tokio::test]
    async fn test_show_missing_file_is_an_error() {
        let (_temp_dir, handlers) = create_test_handlers().await;
        let err = handlers
            .show_file(params(r#"{"path":"nope.txt"}"#))
            .await
            .expect_err("Missing file should fail");
        assert!(err.message.contains("nope.txt"));
    }

    #[tokio::test]
    async fn test_start_build_without_model_fails() {
        let (_temp_dir, handlers) = create_test_handlers().await;
        let err = handlers
            .start_build(params(r#"{"prompt":"a blog"}"#))
            .await
            .expect_err("Start without a model should fail");
        assert!(err.message.contains("no model client configured"));
    }

    #[tokio::test]
    async fn test_export_project_to_default_path() {
        let (temp_dir, handlers) = create_test_handlers().await;
        handlers
            .submit_response(params(&serde_json::json!({ "response": REPLY }).to_string()))
            .await
            .expect("Failed to submit response");

        let result = handlers
            .export_project(params("{}"))
            .await
            .expect("Failed to export");
        assert!(body(&result).starts_with("Success: Exported 2 files"));
        assert!(temp_dir.path().join("project.zip").exists());
    }

    #[tokio::test]
    async fn test_preview_status_without_sandbox() {
        let (_temp_dir, handlers) = create_test_handlers().await;
        let status = body(&handlers.preview_status().await.expect("Failed to get status"));
        assert!(status.contains("no sandbox configured"));
    }
}
