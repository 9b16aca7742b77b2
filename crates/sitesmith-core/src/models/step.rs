//! Step model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::StepStatus;

/// What a step asks for.
///
/// The original product also declared update and delete variants that no
/// producer ever emitted; writing an existing path already covers updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Write `content` to `path`, creating parent folders as needed
    CreateOrUpdateFile { path: String, content: String },

    /// Run a shell command in the sandbox
    RunCommand { command: String },
}

/// One build instruction extracted from a model response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    /// Position of the step in the session's build history (1-based)
    pub id: u64,

    /// The instruction itself
    #[serde(flatten)]
    pub kind: StepKind,

    /// Lifecycle flag
    pub status: StepStatus,

    /// Human-readable label, used only for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Reason the step was rejected, set only when status = Error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Timestamp when the step was parsed (UTC)
    pub created_at: Timestamp,
}

impl Step {
    /// Creates a pending file write step.
    pub fn create_file(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self::pending(
            StepKind::CreateOrUpdateFile {
                content: content.into(),
                path: path.clone(),
            },
            Some(format!("Create {path}")),
        )
    }

    /// Creates a pending shell command step.
    pub fn run_command(command: impl Into<String>) -> Self {
        Self::pending(
            StepKind::RunCommand {
                command: command.into(),
            },
            Some("Run command".to_string()),
        )
    }

    fn pending(kind: StepKind, description: Option<String>) -> Self {
        Self {
            id: 0,
            kind,
            status: StepStatus::Pending,
            description,
            error: None,
            created_at: Timestamp::now(),
        }
    }

    /// The target path, for file steps.
    pub fn path(&self) -> Option<&str> {
        match &self.kind {
            StepKind::CreateOrUpdateFile { path, .. } => Some(path),
            StepKind::RunCommand { .. } => None,
        }
    }

    /// The shell command, for command steps.
    pub fn command(&self) -> Option<&str> {
        match &self.kind {
            StepKind::RunCommand { command } => Some(command),
            StepKind::CreateOrUpdateFile { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }

    /// Marks the step completed. Returns false if the step was already in a
    /// terminal state, in which case nothing changes.
    pub fn complete(&mut self) -> bool {
        self.advance(StepStatus::Completed, None)
    }

    /// Marks the step failed with a reason. Returns false if the step was
    /// already in a terminal state.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        self.advance(StepStatus::Error, Some(reason.into()))
    }

    fn advance(&mut self, next: StepStatus, error: Option<String>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.error = error;
        true
    }
}
