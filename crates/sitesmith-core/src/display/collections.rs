//! Collection wrapper types for displaying groups of domain objects.

use std::{fmt, ops::Index};

use crate::{
    models::{FileTreeNode, NodeEntry, Step, StepStatus},
    tree::FileTree,
};

/// Newtype wrapper for displaying a step history.
///
/// # Examples
///
/// ```rust
/// use sitesmith_core::{display::Steps, models::Step};
///
/// let steps = Steps(vec![Step::run_command("npm install")]);
/// assert!(steps.to_string().contains("npm install"));
/// assert_eq!(Steps(vec![]).to_string(), "No steps yet.\n");
/// ```
pub struct Steps(pub Vec<Step>);

impl Steps {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.0.iter()
    }

    /// Number of steps with the given status.
    pub fn count(&self, status: StepStatus) -> usize {
        self.0.iter().filter(|s| s.status == status).count()
    }
}

impl Index<usize> for Steps {
    type Output = Step;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IntoIterator for Steps {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Steps {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No steps yet.");
        }
        for step in &self.0 {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Indented markdown outline of a file tree.
///
/// ```text
/// - src/
///   - App.tsx (120 B)
/// - package.json (512 B)
/// ```
pub struct FileListing<'a>(pub &'a FileTree);

impl FileListing<'_> {
    fn write_level(
        f: &mut fmt::Formatter<'_>,
        nodes: &[FileTreeNode],
        depth: usize,
    ) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for node in nodes {
            match &node.entry {
                NodeEntry::File { content } => {
                    writeln!(f, "{indent}- {} ({} B)", node.name, content.len())?
                }
                NodeEntry::Folder { children } => {
                    writeln!(f, "{indent}- {}/", node.name)?;
                    Self::write_level(f, children, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FileListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No files yet.");
        }
        Self::write_level(f, self.0.roots(), 0)
    }
}
