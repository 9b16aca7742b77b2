//! Sitesmith CLI Application
//!
//! Command-line interface and MCP server for the Sitesmith build pipeline.

mod args;
mod cli;
mod mcp;
mod renderer;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use args::{Args, Commands, ModelArgs};
use clap::Parser;
use cli::Cli;
use log::{info, warn};
use mcp::{run_stdio_server, SitesmithMcpServer};
use renderer::TerminalRenderer;
use sitesmith_core::{GeminiClient, GeminiConfig, SessionBuilder};
use Commands::*;

/// Creates the Gemini client when an API key is configured.
fn model_client(model: ModelArgs, timeout: Duration) -> Result<Option<GeminiClient>> {
    let Some(api_key) = model.api_key else {
        return Ok(None);
    };
    let mut config = GeminiConfig::new(api_key).with_timeout(timeout);
    if let Some(base) = model.api_base {
        config = config.with_base_url(base);
    }
    if let Some(name) = model.model {
        config = config.with_model(name);
    }
    let client = GeminiClient::new(config).context("Failed to create Gemini client")?;
    Ok(Some(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        no_color,
        preview_dir,
        model_timeout,
        model,
        command,
    } = Args::parse();

    let model_timeout = Duration::from_secs(model_timeout);
    let mut builder = SessionBuilder::new()
        .with_preview_dir(preview_dir)
        .with_model_timeout(model_timeout);
    match model_client(model, model_timeout)? {
        Some(client) => builder = builder.with_model_client(Arc::new(client)),
        None if matches!(command, Build(_) | Serve) => {
            warn!("No GEMINI_API_KEY set; model calls will fail");
        }
        None => {}
    }

    let session = builder
        .build()
        .await
        .context("Failed to initialize session")?;
    let renderer = TerminalRenderer::new(!no_color);

    info!("Sitesmith started");

    match command {
        Parse(args) => Cli::new(session, renderer).parse(args).await,
        Apply(args) => Cli::new(session, renderer).apply(args).await,
        Build(args) => Cli::new(session, renderer).build(args).await,
        Serve => {
            info!("Starting Sitesmith MCP server");
            run_stdio_server(SitesmithMcpServer::new(session))
                .await
                .context("MCP server failed")
        }
    }
}
