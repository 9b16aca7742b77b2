use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::cli::{ApplyArgs, BuildArgs, ParseArgs};

/// Describe a website, get a project.
///
/// Sitesmith asks a language model for a project, folds the files from its
/// replies into a file tree, previews the result in a local sandbox and
/// exports it as a zip. It can also run as an MCP (Model Context Protocol)
/// server so that other assistants can drive a build.
#[derive(Parser)]
#[command(version, about, name = "smith")]
pub struct Args {
    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory for the local preview sandbox. Without it, builds run
    /// without a live preview
    #[arg(long, global = true)]
    pub preview_dir: Option<PathBuf>,

    /// Seconds to wait for one model reply
    #[arg(long, global = true, default_value_t = 120)]
    pub model_timeout: u64,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Language model connection settings.
#[derive(ClapArgs)]
pub struct ModelArgs {
    /// Gemini API key
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name, e.g. gemini-1.5-pro
    #[arg(long, global = true, env = "SITESMITH_MODEL")]
    pub model: Option<String>,

    /// Base URL of the Gemini API
    #[arg(long, global = true, env = "SITESMITH_API_BASE")]
    pub api_base: Option<String>,
}

/// Available commands for the Sitesmith CLI
///
/// - `parse` and `apply` work offline on saved model replies
/// - `build` talks to the model
/// - `serve` starts the MCP server
#[derive(Subcommand)]
pub enum Commands {
    /// Parse a saved model reply and list its steps
    #[command(alias = "p")]
    Parse(ParseArgs),
    /// Fold saved model replies into a project
    #[command(alias = "a")]
    Apply(ApplyArgs),
    /// Build a project from a description
    #[command(alias = "b")]
    Build(BuildArgs),
    /// Start the MCP server
    Serve,
}
