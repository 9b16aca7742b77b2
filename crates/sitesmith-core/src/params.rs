//! Parameter structures shared by the CLI and the MCP server.
//!
//! Core parameters carry only serde derives (plus `JsonSchema` behind the
//! `schema` feature). Interface layers wrap them: the CLI converts its clap
//! argument structs with `From`, the MCP server deserialises them through a
//! transparent wrapper.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   CLI Args      │    │   MCP Params    │    │  Core Params    │
//! │  (clap derives) │───▶│ (serde derives) │───▶│ (minimal deps)  │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{Step, StepStatus};

/// Parameters for starting a new build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct StartBuild {
    /// Description of the project to build
    pub prompt: String,
}

/// Parameters for a follow-up prompt on the current build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct FollowUp {
    /// Change request, sent with the full conversation so far
    pub prompt: String,
}

/// Parameters for folding a model reply obtained elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SubmitResponse {
    /// Raw reply text containing an `<artifact>` element
    pub response: String,
}

/// Parameters for listing steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ListSteps {
    /// Only show steps with this status: pending, completed or error
    pub status: Option<String>,
}

impl ListSteps {
    /// Keeps the steps that match the status filter.
    ///
    /// An unrecognised status matches nothing.
    pub fn filter(&self, steps: Vec<Step>) -> Vec<Step> {
        match &self.status {
            None => steps,
            Some(status) => match status.parse::<StepStatus>() {
                Ok(wanted) => steps.into_iter().filter(|s| s.status == wanted).collect(),
                Err(_) => Vec::new(),
            },
        }
    }
}

/// Parameters for showing one node of the tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ShowFile {
    /// Path of the file or folder, e.g. `src/App.tsx`
    pub path: String,
}

/// Parameters for exporting the project archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ExportProject {
    /// Where to write the zip; defaults to the session's export path
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_steps_filter() {
        let mut done = Step::create_file("a.txt", "a");
        done.complete();
        let pending = Step::run_command("npm install");
        let steps = vec![done, pending];

        assert_eq!(ListSteps::default().filter(steps.clone()).len(), 2);
        let only_pending = ListSteps {
            status: Some("pending".to_string()),
        }
        .filter(steps.clone());
        assert_eq!(only_pending.len(), 1);
        assert_eq!(only_pending[0].command(), Some("npm install"));
        assert!(ListSteps {
            status: Some("bogus".to_string())
        }
        .filter(steps)
        .is_empty());
    }

    #[test]
    fn test_params_deserialize_with_defaults() {
        let export: ExportProject = serde_json::from_str("{}").unwrap();
        assert!(export.output.is_none());
        let start: StartBuild = serde_json::from_str(r#"{"prompt":"a blog"}"#).unwrap();
        assert_eq!(start.prompt, "a blog");
    }
}
