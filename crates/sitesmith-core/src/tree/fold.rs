//! Folding pending steps into the file tree.

use log::{debug, warn};

use super::{FileTree, Upsert};
use crate::{
    error::BuildError,
    models::{Step, StepKind},
};

/// A step that was rejected during a fold.
#[derive(Debug)]
pub struct RejectedStep {
    pub step_id: u64,
    pub error: BuildError,
}

/// What a fold did.
#[derive(Debug, Default)]
pub struct FoldReport {
    /// Paths of files created, in application order
    pub created: Vec<String>,
    /// Paths of files whose content changed
    pub updated: Vec<String>,
    /// Paths of files rewritten with identical content
    pub unchanged: Vec<String>,
    /// Shell commands to forward to the sandbox, as (step id, command)
    pub commands: Vec<(u64, String)>,
    /// Steps marked `Error`
    pub rejected: Vec<RejectedStep>,
    /// Number of steps that moved out of `Pending`
    pub processed: usize,
}

impl FoldReport {
    /// Whether the tree differs from before the fold.
    pub fn tree_changed(&self) -> bool {
        !self.created.is_empty() || !self.updated.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.processed == 0
    }
}

impl FileTree {
    /// Applies every pending step of `steps`, in order, and advances each one
    /// to `Completed` or `Error`.
    ///
    /// Steps that are already `Completed` or `Error` are skipped, so passing
    /// the full history of a session is safe. A rejected step never prevents
    /// later steps in the same batch from folding.
    pub fn apply_steps(&mut self, steps: &mut [Step]) -> FoldReport {
        let mut report = FoldReport::default();

        for step in steps.iter_mut().filter(|s| s.is_pending()) {
            report.processed += 1;
            match &step.kind {
                StepKind::CreateOrUpdateFile { path, content } => {
                    match self.upsert_file(path, content) {
                        Ok(outcome) => {
                            let node_path = super::path::node_path(path);
                            debug!("Step {}: {:?} {}", step.id, outcome, node_path);
                            match outcome {
                                Upsert::Created => report.created.push(node_path),
                                Upsert::Updated => report.updated.push(node_path),
                                Upsert::Unchanged => report.unchanged.push(node_path),
                            }
                            step.complete();
                        }
                        Err(error) => {
                            warn!("Rejecting step {}: {}", step.id, error);
                            step.fail(error.to_string());
                            report.rejected.push(RejectedStep {
                                step_id: step.id,
                                error,
                            });
                        }
                    }
                }
                StepKind::RunCommand { command } => {
                    report.commands.push((step.id, command.clone()));
                    step.complete();
                }
            }
        }

        report
    }
}
