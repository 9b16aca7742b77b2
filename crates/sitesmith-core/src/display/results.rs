//! Result types for displaying operation outcomes.

use std::fmt;
use std::path::PathBuf;

use crate::{archive::ExportSummary, models::StepStatus, session::BuildOutcome};

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## {}", self.title.as_deref().unwrap_or("Build updated"))?;
        writeln!(f)?;

        if let Some(template) = self.template {
            writeln!(f, "- Template: {template}")?;
        }
        let failed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Error)
            .count();
        writeln!(
            f,
            "- Steps: {} ({} completed, {} rejected)",
            self.steps.len(),
            self.steps.len() - failed,
            failed
        )?;
        writeln!(
            f,
            "- Files: {} created, {} updated, {} unchanged",
            self.report.created.len(),
            self.report.updated.len(),
            self.report.unchanged.len()
        )?;
        if !self.report.commands.is_empty() {
            writeln!(f, "- Commands: {}", self.report.commands.len())?;
        }
        writeln!(f, "- {}", self.preview)?;

        if !self.report.rejected.is_empty() {
            writeln!(f)?;
            writeln!(f, "### Rejected steps")?;
            writeln!(f)?;
            for rejected in &self.report.rejected {
                writeln!(f, "- Step {}: {}", rejected.step_id, rejected.error)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "### Warnings")?;
            writeln!(f)?;
            for warning in &self.warnings {
                writeln!(f, "- {warning}")?;
            }
        }
        Ok(())
    }
}

/// A finished export and where it was written.
pub struct ExportResult {
    pub path: PathBuf,
    pub summary: ExportSummary,
}

impl ExportResult {
    pub fn new(path: impl Into<PathBuf>, summary: ExportSummary) -> Self {
        Self {
            path: path.into(),
            summary,
        }
    }
}

impl fmt::Display for ExportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Exported {} files ({} folders, {} bytes) to {}",
            self.summary.files,
            self.summary.folders,
            self.summary.bytes,
            self.path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::Step,
        sandbox::PreviewState,
        templates::Template,
        tree::FileTree,
    };

    #[test]
    fn test_build_outcome_display() {
        let mut steps = vec![
            Step::create_file("index.html", "<html></html>"),
            Step::create_file("a//b", "bad"),
            Step::run_command("npm install"),
        ];
        for (i, step) in steps.iter_mut().enumerate() {
            step.id = i as u64 + 1;
        }
        let report = FileTree::new().apply_steps(&mut steps);
        let outcome = BuildOutcome {
            template: Some(Template::React),
            title: Some("Landing page".to_string()),
            steps,
            report,
            warnings: vec!["Protocol parse error: unterminated artifact".to_string()],
            preview: PreviewState::Mounted,
        };
        let output = outcome.to_string();

        assert!(output.starts_with("## Landing page\n"));
        assert!(output.contains("- Template: react"));
        assert!(output.contains("- Steps: 3 (2 completed, 1 rejected)"));
        assert!(output.contains("- Files: 1 created, 0 updated, 0 unchanged"));
        assert!(output.contains("- Commands: 1"));
        assert!(output.contains("- Step 2: Invalid path 'a//b'"));
        assert!(output.contains("unterminated artifact"));
    }

    #[test]
    fn test_export_result_display() {
        let result = ExportResult::new(
            "/tmp/project.zip",
            ExportSummary {
                files: 2,
                folders: 3,
                bytes: 512,
            },
        );
        assert_eq!(
            result.to_string(),
            "Exported 2 files (3 folders, 512 bytes) to /tmp/project.zip\n"
        );
    }
}
