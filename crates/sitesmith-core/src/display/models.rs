//! Display implementations for domain models.
//!
//! Output is markdown, rendered by the CLI's terminal renderer and returned
//! verbatim by the MCP tools.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::{
    models::{FileTreeNode, Message, NodeEntry, Step, StepKind, StepStatus},
    sandbox::PreviewState,
};

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.description.as_deref().unwrap_or(match self.kind {
            StepKind::CreateOrUpdateFile { .. } => "Write file",
            StepKind::RunCommand { .. } => "Run command",
        });
        writeln!(f, "### {}. {} ({})", self.id, label, self.status.with_icon())?;
        writeln!(f)?;

        match &self.kind {
            StepKind::CreateOrUpdateFile { path, content } => {
                writeln!(f, "- Path: `{path}`")?;
                writeln!(f, "- Size: {} lines, {} bytes", content.lines().count(), content.len())?;
            }
            StepKind::RunCommand { command } => {
                writeln!(f, "```sh")?;
                writeln!(f, "{command}")?;
                writeln!(f, "```")?;
            }
        }
        writeln!(f, "- Parsed: {}", LocalDateTime(&self.created_at))?;

        if let Some(error) = &self.error {
            writeln!(f)?;
            writeln!(f, "**Rejected**: {error}")?;
        }
        writeln!(f)
    }
}

/// Fence long enough to wrap `content` without closing early.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

/// Language hint for a fenced block, from the file extension.
fn language_for(name: &str) -> &str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js" | "mjs" | "cjs") => "javascript",
        Some("jsx") => "jsx",
        Some("ts") => "typescript",
        Some("tsx") => "tsx",
        Some("json") => "json",
        Some("html") => "html",
        Some("css") => "css",
        Some("md") => "markdown",
        Some("sh") => "sh",
        _ => "",
    }
}

impl fmt::Display for FileTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            NodeEntry::File { content } => {
                writeln!(f, "## {}", self.path)?;
                writeln!(f)?;
                let fence = fence_for(content);
                writeln!(f, "{fence}{}", language_for(&self.name))?;
                write!(f, "{content}")?;
                if !content.is_empty() && !content.ends_with('\n') {
                    writeln!(f)?;
                }
                writeln!(f, "{fence}")
            }
            NodeEntry::Folder { children } => {
                writeln!(f, "## {}/", self.path)?;
                writeln!(f)?;
                if children.is_empty() {
                    return writeln!(f, "Empty folder.");
                }
                for child in children {
                    let slash = if child.is_folder() { "/" } else { "" };
                    writeln!(f, "- {}{slash}", child.name)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "**{}**:", self.role.as_str())?;
        writeln!(f)?;
        writeln!(f, "{}", self.text())
    }
}

impl fmt::Display for PreviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewState::Unavailable { reason } => write!(f, "Preview unavailable ({reason})"),
            PreviewState::Idle => write!(f, "Preview idle"),
            PreviewState::Mounted => write!(f, "Files mounted, preview not started"),
            PreviewState::Starting { stage } => write!(f, "Preview starting: {stage}"),
            PreviewState::Ready { url, .. } => write!(f, "Preview ready at {url}"),
            PreviewState::Failed { message } => write!(f, "Preview failed: {message}"),
        }
    }
}
