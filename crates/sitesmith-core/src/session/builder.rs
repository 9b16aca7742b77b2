//! Builder for creating and configuring Session instances.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use super::{Session, DEFAULT_MODEL_TIMEOUT};
use crate::{
    archive::DEFAULT_ARCHIVE_NAME,
    error::{BuildError, Result},
    llm::ModelClient,
    sandbox::{
        adapter::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_SPAWN_TIMEOUT},
        LocalSandbox, MountAdapter, Sandbox,
    },
};

/// Builder for creating and configuring Session instances.
#[derive(Clone)]
pub struct SessionBuilder {
    model: Option<Arc<dyn ModelClient>>,
    sandbox: Option<Arc<dyn Sandbox>>,
    preview_dir: Option<PathBuf>,
    export_path: Option<PathBuf>,
    model_timeout: Duration,
    spawn_timeout: Duration,
    command_timeout: Duration,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("model", &self.model.is_some())
            .field("sandbox", &self.sandbox.is_some())
            .field("preview_dir", &self.preview_dir)
            .field("export_path", &self.export_path)
            .field("model_timeout", &self.model_timeout)
            .finish()
    }
}

impl SessionBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            model: None,
            sandbox: None,
            preview_dir: None,
            export_path: None,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Sets the language model. Without one, only offline operations
    /// (submitting replies, export) are available.
    pub fn with_model_client(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    /// Uses `sandbox` for the live preview. Takes precedence over
    /// [`SessionBuilder::with_preview_dir`].
    pub fn with_sandbox(mut self, sandbox: Arc<dyn Sandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Runs the live preview in a [`LocalSandbox`] rooted at `dir`.
    pub fn with_preview_dir<P: AsRef<Path>>(mut self, dir: Option<P>) -> Self {
        if let Some(dir) = dir {
            self.preview_dir = Some(dir.as_ref().to_path_buf());
        }
        self
    }

    /// Sets where [`Session::export_default`] writes the archive.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/sitesmith/exports/project.zip` or
    /// `~/.local/share/sitesmith/exports/project.zip`
    pub fn with_export_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.export_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_spawn_timeout(mut self, timeout: Duration) -> Self {
        self.spawn_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Builds the configured session.
    ///
    /// A preview directory that cannot be used does not fail the build; the
    /// session starts with the preview `Unavailable` instead.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::XdgDirectory` if no export path was given and the
    /// default one cannot be determined.
    pub async fn build(self) -> Result<Session> {
        let export_path = match self.export_path {
            Some(path) => path,
            None => Self::default_export_path()?,
        };

        let preview = match (self.sandbox, self.preview_dir) {
            (Some(sandbox), _) => MountAdapter::new(sandbox),
            (None, Some(dir)) => match LocalSandbox::boot(&dir).await {
                Ok(sandbox) => MountAdapter::new(Arc::new(sandbox)),
                Err(e) => {
                    warn!("Live preview disabled: {e}");
                    MountAdapter::unavailable(e.to_string())
                }
            },
            (None, None) => MountAdapter::unavailable("no sandbox configured"),
        }
        .with_timeouts(self.spawn_timeout, self.command_timeout);

        Ok(Session::new(
            self.model,
            preview,
            self.model_timeout,
            export_path,
        ))
    }

    /// Returns the default export path following XDG Base Directory
    /// specification.
    fn default_export_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("sitesmith")
            .place_data_file(format!("exports/{DEFAULT_ARCHIVE_NAME}"))
            .map_err(|e| BuildError::XdgDirectory(e.to_string()))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
