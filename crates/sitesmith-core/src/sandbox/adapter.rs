//! Bridge between a session and an optional sandbox.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::{local::detect_server_url, ProcessHandle, Sandbox};
use crate::{
    error::{BuildError, Result},
    mount::MountDescriptor,
    protocol::{split_command, Invocation},
    tree::FileTree,
};

/// Default bound on a single mount or spawn call.
pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a forwarded command running to completion.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

const OUTPUT_CAPACITY: usize = 200;

/// Package-manager scripts that start a server rather than finish.
const SERVER_SCRIPTS: &[&str] = &["dev", "start", "preview", "serve"];

/// Programs that serve until stopped.
const SERVER_PROGRAMS: &[&str] = &["vite", "next", "serve", "http-server", "live-server"];

/// What a preview consumer can currently expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PreviewState {
    /// No sandbox, or the sandbox rejected the last mount
    Unavailable { reason: String },
    /// Sandbox ready, nothing mounted yet
    Idle,
    /// The current tree is mounted, no dev server running
    Mounted,
    /// Install or dev server startup in progress
    Starting { stage: String },
    /// Dev server listening
    Ready { port: u16, url: String },
    /// Preview startup failed; it can be started again
    Failed { message: String },
}

impl PreviewState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewState::Ready { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, PreviewState::Unavailable { .. })
    }

    /// Preview URL, once ready.
    pub fn url(&self) -> Option<&str> {
        match self {
            PreviewState::Ready { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Most recent sandbox output lines.
#[derive(Debug, Clone, Default)]
struct OutputLog(Arc<StdMutex<VecDeque<String>>>);

impl OutputLog {
    fn record(&self, line: String) {
        debug!("sandbox: {line}");
        if let Ok(mut lines) = self.0.lock() {
            if lines.len() == OUTPUT_CAPACITY {
                lines.pop_front();
            }
            lines.push_back(line);
        }
    }

    fn tail(&self, n: usize) -> Vec<String> {
        self.0
            .lock()
            .map(|lines| lines.iter().skip(lines.len().saturating_sub(n)).cloned().collect())
            .unwrap_or_default()
    }
}

/// Supervisors of processes left running in the background. Aborting a
/// supervisor drops its handle, which stops the process.
#[derive(Debug, Clone, Default)]
struct Background(Arc<StdMutex<Vec<JoinHandle<()>>>>);

impl Background {
    fn push(&self, task: JoinHandle<()>) {
        if let Ok(mut tasks) = self.0.lock() {
            tasks.retain(|task| !task.is_finished());
            tasks.push(task);
        }
    }

    fn abort_all(&self) {
        if let Ok(mut tasks) = self.0.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

/// Projects tree snapshots into the sandbox and runs commands there.
///
/// Every sandbox failure is absorbed into [`PreviewState`]; none of the
/// adapter's methods return an error. Remounts are serialised and carry a
/// generation number so an older snapshot never overwrites a newer one.
/// Forwarded command batches run in the background, one batch after the
/// other, in the order they were forwarded. Servers started by a batch keep
/// running under a supervisor and never hold up the next batch; they are
/// stopped when the adapter is dropped.
pub struct MountAdapter {
    sandbox: Option<Arc<dyn Sandbox>>,
    state: Arc<watch::Sender<PreviewState>>,
    mounted_generation: Mutex<u64>,
    last_batch: StdMutex<Option<JoinHandle<()>>>,
    background: Background,
    output: OutputLog,
    spawn_timeout: Duration,
    command_timeout: Duration,
}

impl std::fmt::Debug for MountAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountAdapter")
            .field("available", &self.sandbox.is_some())
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl MountAdapter {
    /// Adapter over a live sandbox. Server-ready notifications move the
    /// preview to [`PreviewState::Ready`].
    pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
        let adapter = Self::with_state(Some(sandbox.clone()), PreviewState::Idle);
        let state = adapter.state.clone();
        sandbox.on_server_ready(Arc::new(move |port, url| {
            info!("Preview ready at {url}");
            state.send_replace(PreviewState::Ready { port, url });
        }));
        adapter
    }

    /// Adapter with no sandbox behind it.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::with_state(
            None,
            PreviewState::Unavailable {
                reason: reason.into(),
            },
        )
    }

    fn with_state(sandbox: Option<Arc<dyn Sandbox>>, initial: PreviewState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            sandbox,
            state: Arc::new(state),
            mounted_generation: Mutex::new(0),
            last_batch: StdMutex::new(None),
            background: Background::default(),
            output: OutputLog::default(),
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Sets the bounds for mount/spawn calls and for commands to finish.
    pub fn with_timeouts(mut self, spawn: Duration, command: Duration) -> Self {
        self.spawn_timeout = spawn;
        self.command_timeout = command;
        self
    }

    pub fn is_available(&self) -> bool {
        self.sandbox.is_some()
    }

    pub fn state(&self) -> PreviewState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every preview state change.
    pub fn subscribe(&self) -> watch::Receiver<PreviewState> {
        self.state.subscribe()
    }

    /// The last `n` lines of sandbox output.
    pub fn output_tail(&self, n: usize) -> Vec<String> {
        self.output.tail(n)
    }

    /// Mounts `tree`, produced by fold number `generation`.
    ///
    /// Snapshots older than the last mounted one are skipped. A failed or
    /// timed-out mount turns the preview `Unavailable`; the next successful
    /// mount brings it back.
    pub async fn remount(&self, generation: u64, tree: &FileTree) -> PreviewState {
        let Some(sandbox) = &self.sandbox else {
            debug!("No sandbox, skipping mount of generation {generation}");
            return self.state();
        };

        let mut mounted = self.mounted_generation.lock().await;
        if generation <= *mounted {
            debug!("Skipping stale mount of generation {generation} (have {})", *mounted);
            return self.state();
        }

        let descriptor = MountDescriptor::from_tree(tree);
        let result = tokio::time::timeout(self.spawn_timeout, sandbox.mount(&descriptor)).await;
        match result {
            Ok(Ok(())) => {
                *mounted = generation;
                debug!("Mounted generation {generation}");
                self.state.send_if_modified(|state| match state {
                    PreviewState::Idle | PreviewState::Unavailable { .. } => {
                        *state = PreviewState::Mounted;
                        true
                    }
                    _ => false,
                });
            }
            Ok(Err(e)) => {
                warn!("Mount failed, preview unavailable: {e}");
                self.publish(PreviewState::Unavailable {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Mount timed out after {}s", self.spawn_timeout.as_secs());
                self.publish(PreviewState::Unavailable {
                    reason: format!("mount timed out after {}s", self.spawn_timeout.as_secs()),
                });
            }
        }
        self.state()
    }

    /// Runs `commands` in the sandbox in a background task and returns
    /// immediately.
    ///
    /// Each command is split on `&&`; its invocations run in order and a
    /// failing invocation skips the rest of that command. An invocation that
    /// starts a server counts as done once it is up: it is recognised by
    /// name (`npm run dev`, `vite`) or by printing a local URL. Returns false
    /// when there is nothing to run or no sandbox to run it in.
    pub fn forward_commands(&self, commands: Vec<(u64, String)>) -> bool {
        let Some(sandbox) = self.sandbox.clone() else {
            if !commands.is_empty() {
                debug!("No sandbox, dropping {} command(s)", commands.len());
            }
            return false;
        };
        if commands.is_empty() {
            return false;
        }

        let Ok(mut last_batch) = self.last_batch.lock() else {
            return false;
        };
        let previous = last_batch.take();
        let runner = self.runner(sandbox);

        *last_batch = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            for (step_id, command) in commands {
                for invocation in split_command(&command) {
                    if let Err(e) = runner.run_step(&invocation).await {
                        warn!("Step {step_id}: {e}");
                        break;
                    }
                }
            }
        }));
        true
    }

    /// Waits for every forwarded command batch to finish. Servers the
    /// batches started are not waited for; a command that neither exits nor
    /// serves is killed after the command timeout.
    pub async fn settle(&self) {
        let pending = self.last_batch.lock().ok().and_then(|mut last| last.take());
        if let Some(pending) = pending {
            let _ = pending.await;
        }
    }

    /// Installs dependencies and starts the dev server, then waits for the
    /// sandbox to report the server URL.
    ///
    /// Returns the resulting state: `Ready` on success, `Failed` when a step
    /// of the startup failed, `Unavailable` without a sandbox. Calling it
    /// while a preview is starting or ready returns the current state.
    pub async fn start_preview(&self) -> PreviewState {
        let Some(sandbox) = self.sandbox.clone() else {
            return self.state();
        };
        if matches!(
            self.state(),
            PreviewState::Ready { .. } | PreviewState::Starting { .. }
        ) {
            return self.state();
        }

        self.settle().await;
        let runner = self.runner(sandbox);

        self.publish(PreviewState::Starting {
            stage: "Installing dependencies".to_string(),
        });
        if let Err(e) = runner.run(&Invocation::new("npm", ["install"])).await {
            return self.fail(e);
        }

        self.publish(PreviewState::Starting {
            stage: "Starting dev server".to_string(),
        });
        let mut updates = self.subscribe();
        let dev = Invocation::new("npm", ["run", "dev"]);
        let handle = match runner.spawn(&dev).await {
            Ok(handle) => handle,
            Err(e) => return self.fail(e),
        };

        let state = self.state.clone();
        let output = self.output.clone();
        self.background.push(tokio::spawn(async move {
            let code = handle.finish_with(|line| output.record(line)).await;
            warn!("Dev server exited ({code:?})");
            state.send_replace(PreviewState::Failed {
                message: match code {
                    Some(code) => format!("dev server exited with code {code}"),
                    None => "dev server was terminated".to_string(),
                },
            });
        }));

        let settled = matches!(
            tokio::time::timeout(
                self.command_timeout,
                updates.wait_for(|s| {
                    matches!(s, PreviewState::Ready { .. } | PreviewState::Failed { .. })
                }),
            )
            .await,
            Ok(Ok(_))
        );
        if !settled {
            return self.fail(BuildError::command_failed(
                dev.to_string(),
                format!(
                    "no server URL reported within {}s",
                    self.command_timeout.as_secs()
                ),
            ));
        }
        self.state()
    }

    fn runner(&self, sandbox: Arc<dyn Sandbox>) -> Runner {
        Runner {
            sandbox,
            output: self.output.clone(),
            background: self.background.clone(),
            spawn_timeout: self.spawn_timeout,
            command_timeout: self.command_timeout,
        }
    }

    fn publish(&self, next: PreviewState) {
        debug!("Preview state: {next:?}");
        self.state.send_replace(next);
    }

    fn fail(&self, error: BuildError) -> PreviewState {
        warn!("Preview failed: {error}");
        let failed = PreviewState::Failed {
            message: error.to_string(),
        };
        self.publish(failed.clone());
        failed
    }
}

impl Drop for MountAdapter {
    fn drop(&mut self) {
        if let Ok(mut last_batch) = self.last_batch.lock() {
            if let Some(batch) = last_batch.take() {
                batch.abort();
            }
        }
        self.background.abort_all();
    }
}

/// Whether `invocation` starts a server that runs until stopped.
fn is_server_command(invocation: &Invocation) -> bool {
    let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
    match (invocation.program.as_str(), args.as_slice()) {
        ("npm" | "pnpm" | "yarn" | "bun", ["run", script, ..]) => SERVER_SCRIPTS.contains(script),
        ("npm" | "pnpm" | "yarn" | "bun", [script, ..]) => SERVER_SCRIPTS.contains(script),
        ("npx", [program, rest @ ..]) => serves(program, rest),
        (program, rest) => serves(program, rest),
    }
}

fn serves(program: &str, args: &[&str]) -> bool {
    SERVER_PROGRAMS.contains(&program) && !matches!(args.first(), Some(&"build"))
}

/// Runs invocations in a sandbox with the adapter's bounds.
struct Runner {
    sandbox: Arc<dyn Sandbox>,
    output: OutputLog,
    background: Background,
    spawn_timeout: Duration,
    command_timeout: Duration,
}

impl Runner {
    async fn spawn(&self, invocation: &Invocation) -> Result<ProcessHandle> {
        tokio::time::timeout(self.spawn_timeout, self.sandbox.spawn(invocation))
            .await
            .map_err(|_| {
                BuildError::command_failed(
                    invocation.to_string(),
                    format!("spawn timed out after {}s", self.spawn_timeout.as_secs()),
                )
            })?
    }

    /// Runs `invocation` to completion.
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        info!("Running '{invocation}'");
        let handle = self.spawn(invocation).await?;
        let output = self.output.clone();
        let code = handle
            .wait_with(self.command_timeout, |line| output.record(line))
            .await
            .map_err(|_| self.timed_out(invocation))?;
        exit_status(invocation, code)
    }

    /// Runs a forwarded invocation until it exits or turns out to be a
    /// server, which is then left running under a supervisor.
    async fn run_step(&self, invocation: &Invocation) -> Result<()> {
        info!("Running '{invocation}'");
        let mut handle = self.spawn(invocation).await?;
        if is_server_command(invocation) {
            self.detach(invocation, handle);
            return Ok(());
        }

        let deadline = tokio::time::Instant::now() + self.command_timeout;
        loop {
            let next = tokio::time::timeout_at(deadline, handle.next_line()).await;
            match next {
                Err(_) => return Err(self.timed_out(invocation)),
                Ok(None) => break,
                Ok(Some(line)) => {
                    let serving = detect_server_url(&line).is_some();
                    self.output.record(line);
                    if serving {
                        self.detach(invocation, handle);
                        return Ok(());
                    }
                }
            }
        }

        let output = self.output.clone();
        let code = tokio::time::timeout_at(deadline, handle.finish_with(|line| output.record(line)))
            .await
            .map_err(|_| self.timed_out(invocation))?;
        exit_status(invocation, code)
    }

    fn detach(&self, invocation: &Invocation, handle: ProcessHandle) {
        info!("'{invocation}' keeps running in the background");
        let label = invocation.to_string();
        let output = self.output.clone();
        self.background.push(tokio::spawn(async move {
            let code = handle.finish_with(|line| output.record(line)).await;
            info!("Background process '{label}' exited ({code:?})");
        }));
    }

    fn timed_out(&self, invocation: &Invocation) -> BuildError {
        BuildError::command_failed(
            invocation.to_string(),
            format!("still running after {}s, killed", self.command_timeout.as_secs()),
        )
    }
}

fn exit_status(invocation: &Invocation, code: Option<i32>) -> Result<()> {
    match code {
        Some(0) => Ok(()),
        Some(code) => Err(BuildError::command_failed(
            invocation.to_string(),
            format!("exited with code {code}"),
        )),
        None => Err(BuildError::command_failed(
            invocation.to_string(),
            "terminated by signal",
        )),
    }
}
