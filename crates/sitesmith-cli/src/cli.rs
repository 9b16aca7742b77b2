//! Command-line argument wrappers and the command handler.
//!
//! Each command has a clap argument struct that converts into the core
//! parameter types with `From`, so that the core stays free of clap:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Session
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::{debug, info};
use sitesmith_core::{
    display::{ExportResult, FileListing, OperationStatus, Steps},
    parse_response,
    params::{ExportProject, FollowUp, StartBuild, SubmitResponse},
    Session,
};

use crate::renderer::TerminalRenderer;

/// Parse a saved model reply
#[derive(Args)]
pub struct ParseArgs {
    /// File holding the raw reply text
    pub file: PathBuf,
}

/// Fold saved model replies, in order, into a project
#[derive(Args)]
pub struct ApplyArgs {
    /// Files holding raw reply texts, applied in the given order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Write the resulting project to this zip file
    #[arg(short, long)]
    pub export: Option<PathBuf>,
}

/// Build a project from a description
#[derive(Args)]
pub struct BuildArgs {
    /// What to build, e.g. "a landing page for a bakery"
    pub prompt: String,
    /// Change requests sent after the first reply, in order
    #[arg(short, long = "follow-up", value_name = "PROMPT")]
    pub follow_ups: Vec<String>,
    /// Write the resulting project to this zip file
    #[arg(short, long)]
    pub export: Option<PathBuf>,
    /// Install dependencies and start the dev server when done
    #[arg(long)]
    pub preview: bool,
}

impl From<&BuildArgs> for StartBuild {
    fn from(val: &BuildArgs) -> Self {
        StartBuild {
            prompt: val.prompt.clone(),
        }
    }
}

impl BuildArgs {
    pub fn follow_ups(&self) -> impl Iterator<Item = FollowUp> + '_ {
        self.follow_ups.iter().map(|prompt| FollowUp {
            prompt: prompt.clone(),
        })
    }
}

fn export_params(export: Option<&PathBuf>) -> Option<ExportProject> {
    export.map(|path| ExportProject {
        output: Some(path.display().to_string()),
    })
}

/// Runs CLI commands against a session and renders the results.
pub struct Cli {
    session: Session,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(session: Session, renderer: TerminalRenderer) -> Self {
        Self { session, renderer }
    }

    /// Parses one reply strictly and prints its steps.
    pub async fn parse(&self, args: ParseArgs) -> Result<()> {
        let text = read_reply(&args.file).await?;
        let parsed = parse_response(&text)
            .with_context(|| format!("Failed to parse {}", args.file.display()))?;

        let mut output = String::new();
        for artifact in &parsed.artifacts {
            output.push_str(&format!(
                "# {}\n\n",
                artifact.title.as_deref().unwrap_or("Untitled artifact")
            ));
        }
        output.push_str(&Steps(parsed.steps).to_string());
        self.renderer.render(&output)
    }

    /// Folds replies in order, prints the tree, and optionally exports it.
    pub async fn apply(&self, args: ApplyArgs) -> Result<()> {
        for file in &args.files {
            let params = SubmitResponse {
                response: read_reply(file).await?,
            };
            debug!("Applying {}", file.display());
            let outcome = self.session.submit_response(&params.response).await;
            self.renderer.render(&outcome.to_string())?;
        }
        self.session.settle().await;

        let tree = self.session.tree().await;
        self.renderer
            .render(&format!("## Files\n\n{}", FileListing(&tree)))?;

        if let Some(params) = export_params(args.export.as_ref()) {
            self.export(&params).await?;
        }
        Ok(())
    }

    /// Runs a full build: start, follow-ups, optional preview and export.
    pub async fn build(&self, args: BuildArgs) -> Result<()> {
        let start = StartBuild::from(&args);
        info!("Building: {}", start.prompt);
        let outcome = self
            .session
            .start(&start.prompt)
            .await
            .context("Failed to start build")?;
        self.renderer.render(&outcome.to_string())?;

        for follow_up in args.follow_ups() {
            let outcome = self
                .session
                .follow_up(&follow_up.prompt)
                .await
                .context("Failed to apply follow-up")?;
            self.renderer.render(&outcome.to_string())?;
        }
        self.session.settle().await;

        if args.preview {
            let state = self.session.start_preview().await;
            self.renderer.render(&format!("{state}\n"))?;
            for line in self.session.preview_output(20) {
                self.renderer.render(&format!("    {line}\n"))?;
            }
        }

        let tree = self.session.tree().await;
        self.renderer
            .render(&format!("## Files\n\n{}", FileListing(&tree)))?;

        if let Some(params) = export_params(args.export.as_ref()) {
            self.export(&params).await?;
        }
        Ok(())
    }

    async fn export(&self, params: &ExportProject) -> Result<()> {
        let path = params
            .output
            .as_ref()
            .map_or_else(|| self.session.export_path().to_path_buf(), PathBuf::from);
        let summary = self
            .session
            .export_to(&path)
            .await
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        let result = ExportResult::new(path, summary).to_string();
        let status = OperationStatus::success(result.trim_end());
        self.renderer.render(&status.to_string())
    }
}

async fn read_reply(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
