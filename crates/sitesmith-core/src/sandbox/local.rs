//! Host-backed sandbox rooted at a working directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use super::{ProcessHandle, Sandbox, ServerReadyCallback};
use crate::{
    error::{BuildError, Result},
    mount::MountDescriptor,
    protocol::Invocation,
};

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI regex"));

static LOCAL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:localhost|127\.0\.0\.1|0\.0\.0\.0|\[::1\]):(\d{2,5})/?\S*")
        .expect("valid local URL regex")
});

/// Finds a local server URL in a line of process output.
pub fn detect_server_url(line: &str) -> Option<(u16, String)> {
    let clean = ANSI_ESCAPE.replace_all(line, "");
    let captures = LOCAL_URL.captures(&clean)?;
    let port = captures.get(1)?.as_str().parse().ok()?;
    Some((port, captures.get(0)?.as_str().to_string()))
}

type Listeners = Arc<Mutex<Vec<ServerReadyCallback>>>;

/// Top-level entries a remount leaves alone.
const PRESERVED: &[&str] = &["node_modules"];

/// Sandbox that writes the project under a root directory and runs
/// commands there as ordinary child processes.
pub struct LocalSandbox {
    root: PathBuf,
    listeners: Listeners,
}

impl std::fmt::Debug for LocalSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSandbox")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl LocalSandbox {
    /// Prepares `root` for use.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::SandboxUnavailable` if the directory cannot be
    /// created or written to.
    pub async fn boot(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            BuildError::sandbox_unavailable(format!("cannot create {}: {e}", root.display()))
        })?;

        let probe = root.join(".sitesmith-probe");
        tokio::fs::write(&probe, b"")
            .await
            .map_err(|e| BuildError::sandbox_unavailable(format!("{} is not writable: {e}", root.display())))?;
        let _ = tokio::fs::remove_file(&probe).await;

        info!("Local sandbox ready at {}", root.display());
        Ok(Self {
            root,
            listeners: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deletes everything under the root that `wanted` (relative path to
    /// "is a folder") does not list, so a remount mirrors the tree exactly.
    /// Entries whose kind changed are deleted too. Top-level
    /// `node_modules` survives.
    async fn prune(&self, wanted: &HashMap<&str, bool>) -> Result<usize> {
        let mut removed = 0;
        let mut pending = vec![(self.root.clone(), String::new())];
        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| BuildError::file_system(&dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| BuildError::file_system(&dir, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                if prefix.is_empty() && PRESERVED.contains(&name.as_str()) {
                    continue;
                }
                let relative = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                let path = entry.path();
                let is_dir = entry
                    .file_type()
                    .await
                    .map_err(|e| BuildError::file_system(&path, e))?
                    .is_dir();

                match wanted.get(relative.as_str()) {
                    Some(&folder) if folder == is_dir => {
                        if is_dir {
                            pending.push((path, relative));
                        }
                    }
                    _ => {
                        let result = if is_dir {
                            tokio::fs::remove_dir_all(&path).await
                        } else {
                            tokio::fs::remove_file(&path).await
                        };
                        result.map_err(|e| BuildError::file_system(&path, e))?;
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    async fn mount(&self, descriptor: &MountDescriptor) -> Result<()> {
        let entries = descriptor.flatten();
        let removed = {
            let wanted: HashMap<&str, bool> = entries
                .iter()
                .map(|(path, contents)| (path.as_str(), contents.is_none()))
                .collect();
            self.prune(&wanted).await?
        };
        if removed > 0 {
            debug!("Removed {removed} stale entries under {}", self.root.display());
        }

        let mut written = 0usize;
        for (path, contents) in entries {
            let target = self.root.join(&path);
            match contents {
                None => tokio::fs::create_dir_all(&target)
                    .await
                    .map_err(|e| BuildError::file_system(&target, e))?,
                Some(contents) => {
                    tokio::fs::write(&target, contents)
                        .await
                        .map_err(|e| BuildError::file_system(&target, e))?;
                    written += 1;
                }
            }
        }
        debug!("Mounted {written} files under {}", self.root.display());
        Ok(())
    }

    async fn spawn(&self, invocation: &Invocation) -> Result<ProcessHandle> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BuildError::command_failed(invocation.to_string(), e.to_string()))?;
        debug!("Spawned '{invocation}' (pid {:?})", child.id());

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            pump(stdout, line_tx.clone(), self.listeners.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            pump(stderr, line_tx, self.listeners.clone());
        }

        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let label = invocation.to_string();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    debug!("Killing '{label}'");
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill '{label}': {e}");
                    }
                    child.wait().await
                }
            };
            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Failed to wait for '{label}': {e}");
                    None
                }
            };
            let _ = exit_tx.send(code);
        });

        Ok(ProcessHandle::new(line_rx, exit_rx).with_kill_switch(kill_tx))
    }

    fn on_server_ready(&self, callback: ServerReadyCallback) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(callback);
        }
    }
}

/// Forwards lines from `reader` and notifies listeners of server URLs.
fn pump<R>(reader: R, tx: mpsc::UnboundedSender<String>, listeners: Listeners)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some((port, url)) = detect_server_url(&line) {
                let callbacks = listeners
                    .lock()
                    .map(|l| l.clone())
                    .unwrap_or_default();
                for callback in callbacks {
                    callback(port, url.clone());
                }
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{models::Step, tree::FileTree};

    #[test]
    fn test_detect_server_url() {
        assert_eq!(
            detect_server_url("  ➜  Local:   http://localhost:5173/"),
            Some((5173, "http://localhost:5173/".to_string()))
        );
        assert_eq!(
            detect_server_url("\x1b[32m➜\x1b[39m  Local: http://localhost:\x1b[1m3000\x1b[22m/"),
            Some((3000, "http://localhost:3000/".to_string()))
        );
        assert_eq!(detect_server_url("added 120 packages in 3s"), None);
        assert_eq!(detect_server_url("see https://vitejs.dev/config"), None);
    }

    #[tokio::test]
    async fn test_boot_and_mount_writes_files() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let sandbox = LocalSandbox::boot(temp_dir.path().join("preview"))
            .await
            .expect("Failed to boot sandbox");

        let mut steps = vec![
            Step::create_file("package.json", "{}"),
            Step::create_file("src/App.tsx", "app"),
        ];
        let mut tree = FileTree::new();
        tree.apply_steps(&mut steps);

        sandbox
            .mount(&MountDescriptor::from_tree(&tree))
            .await
            .expect("Failed to mount");

        let app = std::fs::read_to_string(sandbox.root().join("src/App.tsx")).unwrap();
        assert_eq!(app, "app");
        assert!(sandbox.root().join("package.json").is_file());
        assert!(!sandbox.root().join(".sitesmith-probe").exists());
    }

    #[tokio::test]
    async fn test_remount_removes_stale_entries_and_keeps_node_modules() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let sandbox = LocalSandbox::boot(temp_dir.path())
            .await
            .expect("Failed to boot sandbox");

        let mut steps = vec![
            Step::create_file("old.txt", "old"),
            Step::create_file("src/legacy/util.ts", "util"),
            Step::create_file("src/App.tsx", "v1"),
        ];
        let mut first = FileTree::new();
        first.apply_steps(&mut steps);
        sandbox
            .mount(&MountDescriptor::from_tree(&first))
            .await
            .expect("Failed to mount first tree");
        std::fs::create_dir_all(sandbox.root().join("node_modules/react"))
            .expect("Failed to create node_modules");

        let mut steps = vec![
            Step::create_file("new.txt", "new"),
            Step::create_file("src/App.tsx", "v2"),
        ];
        let mut second = FileTree::new();
        second.apply_steps(&mut steps);
        sandbox
            .mount(&MountDescriptor::from_tree(&second))
            .await
            .expect("Failed to mount second tree");

        let root = sandbox.root();
        assert!(!root.join("old.txt").exists());
        assert!(!root.join("src/legacy").exists());
        assert!(root.join("new.txt").is_file());
        assert_eq!(std::fs::read_to_string(root.join("src/App.tsx")).unwrap(), "v2");
        assert!(root.join("node_modules/react").is_dir());
    }

    #[tokio::test]
    async fn test_remount_replaces_file_with_folder() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let sandbox = LocalSandbox::boot(temp_dir.path())
            .await
            .expect("Failed to boot sandbox");
        std::fs::write(sandbox.root().join("src"), "was a file").expect("Failed to write file");

        let mut steps = vec![Step::create_file("src/main.ts", "main")];
        let mut tree = FileTree::new();
        tree.apply_steps(&mut steps);
        sandbox
            .mount(&MountDescriptor::from_tree(&tree))
            .await
            .expect("Failed to mount");

        assert!(sandbox.root().join("src").is_dir());
        assert!(sandbox.root().join("src/main.ts").is_file());
    }

    #[tokio::test]
    async fn test_boot_fails_when_root_is_a_file() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let file = temp_dir.path().join("occupied");
        std::fs::write(&file, "x").unwrap();

        let err = LocalSandbox::boot(file.join("preview")).await.unwrap_err();
        assert!(matches!(err, BuildError::SandboxUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_streams_output_and_fires_server_ready() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let sandbox = LocalSandbox::boot(temp_dir.path())
            .await
            .expect("Failed to boot sandbox");

        let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
        sandbox.on_server_ready(Arc::new(move |port, url| {
            let _ = ready_tx.send((port, url));
        }));

        let invocation = Invocation::new("echo", ["Local: http://localhost:4321/"]);
        let handle = sandbox.spawn(&invocation).await.expect("Failed to spawn");

        let mut lines = Vec::new();
        let code = handle
            .wait_with(Duration::from_secs(10), |line| lines.push(line))
            .await
            .expect("Process did not exit");

        assert_eq!(code, Some(0));
        assert_eq!(lines, vec!["Local: http://localhost:4321/"]);
        assert_eq!(
            ready_rx.recv().await,
            Some((4321, "http://localhost:4321/".to_string()))
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timed_out_process_is_killed() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let sandbox = LocalSandbox::boot(temp_dir.path())
            .await
            .expect("Failed to boot sandbox");

        let invocation = Invocation::new("sh", ["-c", "echo $$; exec sleep 30"]);
        let handle = sandbox.spawn(&invocation).await.expect("Failed to spawn");

        let mut lines = Vec::new();
        let result = handle
            .wait_with(Duration::from_secs(1), |line| lines.push(line))
            .await;
        assert!(matches!(result, Err(BuildError::CommandFailed { .. })));

        let pid = lines.first().expect("Missing pid line").trim().to_string();
        let proc_dir = std::path::PathBuf::from(format!("/proc/{pid}"));
        for _ in 0..50 {
            if !proc_dir.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(!proc_dir.exists(), "process {pid} still running");
    }

    #[tokio::test]
    async fn test_spawn_unknown_program_fails() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let sandbox = LocalSandbox::boot(temp_dir.path())
            .await
            .expect("Failed to boot sandbox");

        let err = sandbox
            .spawn(&Invocation::new("definitely-not-a-real-program", Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { .. }));
    }
}
