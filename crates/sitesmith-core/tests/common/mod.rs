#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sitesmith_core::{
    error::Result,
    protocol::Invocation,
    sandbox::{ProcessHandle, ServerReadyCallback},
    BuildError, ModelClient, ModelRequest, MountDescriptor, Sandbox, Session, SessionBuilder,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

/// Model double that answers from a script, in call order.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Duration,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results<I: IntoIterator<Item = Result<String>>>(replies: I) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn delayed<I, S>(delay: Duration, replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, request: ModelRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Sandbox double that records mounts and spawned invocations.
#[derive(Default)]
pub struct RecordingSandbox {
    pub mounts: Mutex<Vec<MountDescriptor>>,
    pub spawned: Mutex<Vec<Invocation>>,
    listeners: Mutex<Vec<ServerReadyCallback>>,
    dev_servers: Mutex<Vec<(mpsc::UnboundedSender<String>, oneshot::Sender<Option<i32>>)>>,
}

impl RecordingSandbox {
    pub fn spawned_commands(&self) -> Vec<String> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.lock().unwrap().len()
    }
}

#[async_trait]
impl Sandbox for RecordingSandbox {
    async fn mount(&self, descriptor: &MountDescriptor) -> Result<()> {
        self.mounts.lock().unwrap().push(descriptor.clone());
        Ok(())
    }

    async fn spawn(&self, invocation: &Invocation) -> Result<ProcessHandle> {
        self.spawned.lock().unwrap().push(invocation.clone());
        if invocation.to_string() == "npm run dev" {
            // Long-running dev server: keep it alive until the sandbox drops.
            let (tx, rx) = mpsc::unbounded_channel();
            let (exit_tx, exit_rx) = oneshot::channel();
            self.dev_servers.lock().unwrap().push((tx, exit_tx));
            for listener in self.listeners.lock().unwrap().iter() {
                listener(5173, "http://localhost:5173/".to_string());
            }
            return Ok(ProcessHandle::new(rx, exit_rx));
        }
        Ok(ProcessHandle::finished([format!("ok: {invocation}")], 0))
    }

    fn on_server_ready(&self, callback: ServerReadyCallback) {
        self.listeners.lock().unwrap().push(callback);
    }
}

/// Sandbox that is never usable, like a host without cross-origin isolation.
pub struct FailingSandbox;

#[async_trait]
impl Sandbox for FailingSandbox {
    async fn mount(&self, _descriptor: &MountDescriptor) -> Result<()> {
        Err(BuildError::sandbox_unavailable(
            "cross-origin isolation is not enabled",
        ))
    }

    async fn spawn(&self, _invocation: &Invocation) -> Result<ProcessHandle> {
        Err(BuildError::sandbox_unavailable(
            "cross-origin isolation is not enabled",
        ))
    }

    fn on_server_ready(&self, _callback: ServerReadyCallback) {}
}

/// Builder preconfigured with an export path inside a temp dir.
pub fn test_builder() -> (TempDir, SessionBuilder) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let builder = SessionBuilder::new().with_export_path(Some(temp_dir.path().join("project.zip")));
    (temp_dir, builder)
}

/// Helper function to create a session with a model and a sandbox.
pub async fn create_test_session(
    model: Arc<ScriptedModel>,
    sandbox: Arc<dyn Sandbox>,
) -> (TempDir, Session) {
    let (temp_dir, builder) = test_builder();
    let session = builder
        .with_model_client(model)
        .with_sandbox(sandbox)
        .build()
        .await
        .expect("Failed to create session");
    (temp_dir, session)
}

pub fn file_action(path: &str, content: &str) -> String {
    format!("<action type=\"file\" filePath=\"{path}\">{content}</action>")
}

pub fn shell_action(command: &str) -> String {
    format!("<action type=\"shell\">{command}</action>")
}

/// A model reply wrapping `actions` in one artifact.
pub fn reply(title: &str, actions: &[String]) -> String {
    format!(
        "Here is the update.\n<artifact id=\"update\" title=\"{title}\">\n{}\n</artifact>\nDone.",
        actions.join("\n")
    )
}
