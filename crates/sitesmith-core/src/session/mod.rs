//! Build sessions: the pipeline that turns prompts into a project.
//!
//! A [`Session`] owns the three pieces of build state (the step history, the
//! [`FileTree`] and the [`Conversation`]) and drives one exchange at a time:
//!
//! ```text
//! prompt ──▶ model ──▶ parser ──▶ steps ──▶ reducer ──▶ tree snapshot
//!                                                          │
//!                                   sandbox ◀── mount adapter (remount,
//!                                                commands, preview)
//! ```
//!
//! ## Concurrency
//!
//! All state lives behind one async mutex, so two folds never interleave.
//! Model exchanges are serialised by a second, fair mutex: a prompt
//! submitted while another call is in flight waits its turn rather than
//! cancelling it. Remounts and command forwarding happen after the state lock
//! is released and only see an owned snapshot of the tree.
//!
//! ## Failure isolation
//!
//! - A model failure returns an error and leaves the session untouched.
//! - A malformed reply folds zero steps and is reported as a warning.
//! - A bad step is marked `Error`; the rest of its batch still folds.
//! - Sandbox trouble only changes the [`PreviewState`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sitesmith_core::{GeminiClient, GeminiConfig, SessionBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = GeminiClient::new(GeminiConfig::new("api-key"))?;
//! let session = SessionBuilder::new()
//!     .with_model_client(Arc::new(model))
//!     .with_preview_dir(Some("/tmp/preview"))
//!     .build()
//!     .await?;
//!
//! let outcome = session.start("A todo app with dark mode").await?;
//! println!("{} steps", outcome.steps.len());
//!
//! session.follow_up("Add a footer").await?;
//! session.export_default().await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task;

use crate::{
    archive::{self, ExportSummary},
    error::{BuildError, ModelCallKind, Result},
    llm::{ModelClient, ModelRequest},
    models::{Conversation, FileTreeNode, Message, Step},
    mount::MountDescriptor,
    protocol::{parse_response_lenient, ArtifactInfo},
    sandbox::{MountAdapter, PreviewState},
    templates::{self, Template, TemplatePrompts},
    tree::{FileTree, FoldReport},
};

pub mod builder;


pub use builder::SessionBuilder;

/// Default bound on one model call.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one exchange or one submitted reply.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Template chosen by this exchange, for `start` only
    pub template: Option<Template>,
    /// Title of the last artifact in the reply
    pub title: Option<String>,
    /// Steps added by this exchange, with their final status
    pub steps: Vec<Step>,
    /// What the fold did with them
    pub report: FoldReport,
    /// Parse problems that caused a reply to be ignored
    pub warnings: Vec<String>,
    /// Preview state after the remount
    pub preview: PreviewState,
}

/// Mutable build state, guarded by the session's state lock.
#[derive(Debug, Default)]
struct SessionState {
    steps: Vec<Step>,
    tree: FileTree,
    conversation: Conversation,
    artifacts: Vec<ArtifactInfo>,
    template: Option<Template>,
    /// Incremented on every fold that produces a snapshot
    generation: u64,
}

/// Folded batch, ready to be published to the sandbox.
struct Batch {
    title: Option<String>,
    steps: Vec<Step>,
    report: FoldReport,
    warnings: Vec<String>,
    snapshot: Option<(u64, FileTree)>,
}

impl SessionState {
    /// Clears everything but the generation counter.
    fn reset(&mut self) {
        self.steps.clear();
        self.tree = FileTree::new();
        self.conversation.reset();
        self.artifacts.clear();
        self.template = None;
    }

    /// Parses `replies` in order, appends their steps to the history and
    /// folds them into the tree.
    fn ingest(&mut self, replies: &[&str], force_snapshot: bool) -> Batch {
        let start = self.steps.len();
        let mut warnings = Vec::new();
        let mut title = None;

        for reply in replies {
            let (parsed, error) = parse_response_lenient(reply);
            if let Some(error) = error {
                warnings.push(error.to_string());
            }
            if let Some(t) = parsed.title() {
                title = Some(t.to_string());
            }
            self.artifacts.extend(parsed.artifacts);
            for mut step in parsed.steps {
                step.id = self.steps.len() as u64 + 1;
                self.steps.push(step);
            }
        }

        let report = self.tree.apply_steps(&mut self.steps[start..]);
        debug!(
            "Folded {} step(s): {} created, {} updated, {} rejected",
            report.processed,
            report.created.len(),
            report.updated.len(),
            report.rejected.len()
        );

        let snapshot = if force_snapshot || report.tree_changed() {
            self.generation += 1;
            Some((self.generation, self.tree.clone()))
        } else {
            None
        };

        Batch {
            title,
            steps: self.steps[start..].to_vec(),
            report,
            warnings,
            snapshot,
        }
    }
}

/// One user's build: state, model, and preview.
pub struct Session {
    state: Mutex<SessionState>,
    turns: Mutex<()>,
    model: Option<Arc<dyn ModelClient>>,
    preview: MountAdapter,
    model_timeout: Duration,
    export_path: PathBuf,
}

impl Session {
    pub(crate) fn new(
        model: Option<Arc<dyn ModelClient>>,
        preview: MountAdapter,
        model_timeout: Duration,
        export_path: PathBuf,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            turns: Mutex::new(()),
            model,
            preview,
            model_timeout,
            export_path,
        }
    }

    /// Starts a new build from `prompt`, discarding any previous one.
    ///
    /// Asks the model to pick a template, folds the template files, then
    /// sends the template prompts and `prompt` and folds the reply. On
    /// success the conversation holds those user messages and the reply.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ModelCall` if either model call fails or the
    /// template answer is not recognised, and `BuildError::Configuration`
    /// without a model client. The previous build is kept in both cases.
    pub async fn start(&self, prompt: &str) -> Result<BuildOutcome> {
        let _turn = self.turns.lock().await;
        info!("Starting build");

        let selection = ModelRequest::new(vec![Message::user(prompt)])
            .with_system(templates::TEMPLATE_SELECTION_PROMPT);
        let template: Template = self.call_model(selection).await?.parse()?;
        info!("Using {template} template");

        let TemplatePrompts {
            prompts, ui_prompts, ..
        } = template.prompts();
        let mut messages: Vec<Message> = prompts
            .iter()
            .map(|p| Message::user(p.as_str()))
            .collect();
        messages.push(Message::user(prompt));

        let request =
            ModelRequest::new(messages.clone()).with_system(templates::system_prompt());
        let reply = self.call_model(request).await?;

        let batch = {
            let mut state = self.state.lock().await;
            state.reset();
            state.template = Some(template);
            for message in messages {
                state.conversation.push(message);
            }
            state.conversation.push_assistant(reply.as_str());

            let mut replies: Vec<&str> = ui_prompts.iter().map(String::as_str).collect();
            replies.push(&reply);
            state.ingest(&replies, true)
        };
        Ok(self.publish(Some(template), batch).await)
    }

    /// Sends `prompt` with the full conversation and folds the reply.
    ///
    /// The user message and the reply are appended only once the reply has
    /// arrived.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ModelCall` if the call fails; nothing is
    /// appended or folded in that case.
    pub async fn follow_up(&self, prompt: &str) -> Result<BuildOutcome> {
        let _turn = self.turns.lock().await;
        let message = Message::user(prompt);
        let messages = self.state.lock().await.conversation.with_pending(&message);
        debug!("Follow-up with {} message(s) of context", messages.len());

        let request = ModelRequest::new(messages).with_system(templates::system_prompt());
        let reply = self.call_model(request).await?;

        let batch = {
            let mut state = self.state.lock().await;
            state.conversation.push(message);
            state.conversation.push_assistant(reply.as_str());
            state.ingest(&[reply.as_str()], false)
        };
        Ok(self.publish(None, batch).await)
    }

    /// Folds a reply obtained outside the session. The conversation is not
    /// changed.
    pub async fn submit_response(&self, response: &str) -> BuildOutcome {
        let batch = self.state.lock().await.ingest(&[response], false);
        self.publish(None, batch).await
    }

    /// Every step so far, oldest first.
    pub async fn steps(&self) -> Vec<Step> {
        self.state.lock().await.steps.clone()
    }

    /// Snapshot of the current tree.
    pub async fn tree(&self) -> FileTree {
        self.state.lock().await.tree.clone()
    }

    /// Node at `path`, if any.
    pub async fn file(&self, path: &str) -> Option<FileTreeNode> {
        self.state.lock().await.tree.get(path).cloned()
    }

    pub async fn conversation(&self) -> Conversation {
        self.state.lock().await.conversation.clone()
    }

    pub async fn artifacts(&self) -> Vec<ArtifactInfo> {
        self.state.lock().await.artifacts.clone()
    }

    pub async fn template(&self) -> Option<Template> {
        self.state.lock().await.template
    }

    /// Mount descriptor for the current tree.
    pub async fn mount_descriptor(&self) -> MountDescriptor {
        MountDescriptor::from_tree(&self.state.lock().await.tree)
    }

    /// Zip archive of the current tree.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ArchiveWrite` if the archive cannot be written.
    pub async fn export(&self) -> Result<Vec<u8>> {
        let snapshot = self.tree().await;
        task::spawn_blocking(move || archive::export_zip(&snapshot))
            .await
            .map_err(join_error)?
    }

    /// Writes the archive to `path`.
    pub async fn export_to(&self, path: impl AsRef<Path>) -> Result<ExportSummary> {
        let snapshot = self.tree().await;
        let path = path.as_ref().to_path_buf();
        task::spawn_blocking(move || archive::export_to_path(&snapshot, &path))
            .await
            .map_err(join_error)?
    }

    /// Writes the archive to the configured export path.
    pub async fn export_default(&self) -> Result<ExportSummary> {
        self.export_to(&self.export_path).await
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    pub fn preview_state(&self) -> PreviewState {
        self.preview.state()
    }

    /// Receiver that observes preview state changes.
    pub fn subscribe_preview(&self) -> watch::Receiver<PreviewState> {
        self.preview.subscribe()
    }

    /// Installs dependencies and starts the dev server.
    pub async fn start_preview(&self) -> PreviewState {
        self.preview.start_preview().await
    }

    /// The last `n` lines of sandbox output.
    pub fn preview_output(&self, n: usize) -> Vec<String> {
        self.preview.output_tail(n)
    }

    /// Waits for forwarded commands to finish.
    pub async fn settle(&self) {
        self.preview.settle().await;
    }

    async fn call_model(&self, request: ModelRequest) -> Result<String> {
        let model = self.model.as_ref().ok_or_else(|| BuildError::Configuration {
            message: "no model client configured".to_string(),
        })?;

        debug!("Calling model with {} message(s)", request.messages.len());
        match tokio::time::timeout(self.model_timeout, model.generate(request)).await {
            Ok(result) => result.inspect_err(|e| warn!("Model call failed: {e}")),
            Err(_) => {
                warn!(
                    "Model call timed out after {}s",
                    self.model_timeout.as_secs()
                );
                Err(BuildError::model_call(ModelCallKind::Timeout).with_message(format!(
                    "no reply within {}s",
                    self.model_timeout.as_secs()
                )))
            }
        }
    }

    /// Remounts the snapshot and forwards commands, outside the state lock.
    async fn publish(&self, template: Option<Template>, batch: Batch) -> BuildOutcome {
        for warning in &batch.warnings {
            warn!("Ignored reply: {warning}");
        }

        let preview = match &batch.snapshot {
            Some((generation, tree)) => self.preview.remount(*generation, tree).await,
            None => self.preview.state(),
        };
        self.preview.forward_commands(batch.report.commands.clone());

        BuildOutcome {
            template,
            title: batch.title,
            steps: batch.steps,
            report: batch.report,
            warnings: batch.warnings,
            preview,
        }
    }
}

fn join_error(e: task::JoinError) -> BuildError {
    BuildError::ArchiveWrite {
        message: "Export task failed".to_string(),
        source: zip::result::ZipError::Io(std::io::Error::other(e.to_string())),
    }
}
