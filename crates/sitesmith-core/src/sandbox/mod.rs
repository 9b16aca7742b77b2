//! Execution sandbox: the environment that materialises the project, runs
//! its commands and serves the live preview.
//!
//! [`Sandbox`] is the collaborator contract. [`LocalSandbox`] implements it
//! on the host with `tokio::process`. [`MountAdapter`] sits between a session
//! and an optional sandbox and turns every failure into a [`PreviewState`]
//! instead of an error, so editing and export keep working without one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::{
    error::{BuildError, Result},
    mount::MountDescriptor,
    protocol::Invocation,
};

pub mod adapter;
pub mod local;

pub use adapter::{MountAdapter, PreviewState};
pub use local::LocalSandbox;

/// Callback fired with `(port, url)` when a dev server starts listening.
pub type ServerReadyCallback = Arc<dyn Fn(u16, String) + Send + Sync>;

/// An isolated environment able to host the generated project.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Materialises the full project described by `descriptor`.
    async fn mount(&self, descriptor: &MountDescriptor) -> Result<()>;

    /// Starts a process inside the sandbox.
    async fn spawn(&self, invocation: &Invocation) -> Result<ProcessHandle>;

    /// Registers a callback for server-ready notifications.
    fn on_server_ready(&self, callback: ServerReadyCallback);
}

/// A running sandbox process: its merged output lines and its exit code.
///
/// A handle created with a kill switch stops its process when it is dropped
/// before the process exits, so a timed-out wait never leaves it running.
#[derive(Debug)]
pub struct ProcessHandle {
    output: mpsc::UnboundedReceiver<String>,
    exit: oneshot::Receiver<Option<i32>>,
    kill: Option<oneshot::Sender<()>>,
}

impl ProcessHandle {
    pub fn new(
        output: mpsc::UnboundedReceiver<String>,
        exit: oneshot::Receiver<Option<i32>>,
    ) -> Self {
        Self {
            output,
            exit,
            kill: None,
        }
    }

    /// Attaches a kill switch. The sandbox should stop the process when
    /// the paired receiver resolves, whether by a send or by the sender
    /// being dropped.
    pub fn with_kill_switch(mut self, kill: oneshot::Sender<()>) -> Self {
        self.kill = Some(kill);
        self
    }

    /// A handle for a process that already exited with `code` after
    /// printing `lines`.
    pub fn finished<I, S>(lines: I, code: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in lines {
            let _ = tx.send(line.into());
        }
        let (exit_tx, exit_rx) = oneshot::channel();
        let _ = exit_tx.send(Some(code));
        Self::new(rx, exit_rx)
    }

    /// Next output line, or `None` once the process closed its output.
    pub async fn next_line(&mut self) -> Option<String> {
        self.output.recv().await
    }

    /// Drains the output into `on_line` and returns the exit code once the
    /// process ends. A process killed by a signal reports `None`.
    pub async fn finish_with<F>(self, mut on_line: F) -> Option<i32>
    where
        F: FnMut(String),
    {
        let Self {
            mut output,
            exit,
            kill,
        } = self;
        while let Some(line) = output.recv().await {
            on_line(line);
        }
        let code = exit.await.ok().flatten();
        drop(kill);
        code
    }

    /// Like [`ProcessHandle::finish_with`], bounded by `timeout`. A process
    /// still running at the deadline is killed.
    pub async fn wait_with<F>(self, timeout: Duration, on_line: F) -> Result<Option<i32>>
    where
        F: FnMut(String),
    {
        tokio::time::timeout(timeout, self.finish_with(on_line))
            .await
            .map_err(|_| {
                BuildError::command_failed("process", format!("no exit within {timeout:?}"))
            })
    }
}
