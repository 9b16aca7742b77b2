//! The in-memory project file tree and the step reducer that builds it.
//!
//! A [`FileTree`] is a strict prefix hierarchy: a node at `/a/b` always has an
//! ancestor folder at `/a`, and no two nodes share a path. The only way to
//! grow the tree is [`FileTree::upsert_file`], which every fold goes through,
//! so both invariants hold after any sequence of steps.
//!
//! ```rust
//! use sitesmith_core::{models::Step, tree::FileTree};
//!
//! let mut steps = vec![Step::create_file("src/App.tsx", "console.log(\"hi\")")];
//! let mut tree = FileTree::new();
//! let report = tree.apply_steps(&mut steps);
//!
//! assert_eq!(report.created, vec!["/src/App.tsx".to_string()]);
//! assert!(tree.get("/src").unwrap().is_folder());
//! assert_eq!(tree.get("src/App.tsx").unwrap().content(), Some("console.log(\"hi\")"));
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    error::{BuildError, Result},
    models::{FileTreeNode, NodeEntry},
};

pub mod fold;
pub mod path;

#[cfg(test)]
mod tests;

pub use fold::{FoldReport, RejectedStep};

/// Outcome of writing a file into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new file node was added
    Created,
    /// An existing file got different content
    Updated,
    /// An existing file already had this content
    Unchanged,
}

/// Hierarchical, path-addressed representation of the generated project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree {
    roots: Vec<FileTreeNode>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes, in insertion order.
    pub fn roots(&self) -> &[FileTreeNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Looks a node up by path, with or without the leading slash.
    pub fn get(&self, path: &str) -> Option<&FileTreeNode> {
        let wanted = path::node_path(path);
        self.walk().find(|node| node.path == wanted)
    }

    /// Depth-first, pre-order traversal of every node.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Every file node, depth-first.
    pub fn files(&self) -> impl Iterator<Item = &FileTreeNode> {
        self.walk().filter(|node| node.is_file())
    }

    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    pub fn folder_count(&self) -> usize {
        self.walk().filter(|node| node.is_folder()).count()
    }

    /// Writes `content` at the relative `path`, creating missing folders.
    ///
    /// Fails without touching the tree if the path is malformed, or if a
    /// segment collides with a node of the other kind (a folder where a file
    /// should go, or a file where a folder is needed).
    pub fn upsert_file(&mut self, path: &str, content: &str) -> Result<Upsert> {
        let segments = path::segments(path)?;
        self.check_kinds(path, &segments)?;

        let (file_name, folders) = match segments.split_last() {
            Some(split) => split,
            None => return Err(BuildError::invalid_path(path).with_reason("path is empty")),
        };

        let mut current_prefix = String::new();
        let mut level = &mut self.roots;
        for folder in folders {
            current_prefix = format!("{current_prefix}/{folder}");
            let index = match level.iter().position(|n| n.path == current_prefix) {
                Some(index) => index,
                None => {
                    level.push(FileTreeNode::folder(*folder, current_prefix.clone()));
                    level.len() - 1
                }
            };
            level = match &mut level[index].entry {
                NodeEntry::Folder { children } => children,
                NodeEntry::File { .. } => {
                    return Err(BuildError::invalid_path(path)
                        .with_reason(format!("'{current_prefix}' is a file")))
                }
            };
        }

        let file_path = format!("{current_prefix}/{file_name}");
        match level.iter_mut().find(|n| n.path == file_path) {
            Some(node) => match &mut node.entry {
                NodeEntry::File { content: existing } if existing.as_str() == content => {
                    Ok(Upsert::Unchanged)
                }
                NodeEntry::File { content: existing } => {
                    content.clone_into(existing);
                    Ok(Upsert::Updated)
                }
                NodeEntry::Folder { .. } => Err(BuildError::invalid_path(path)
                    .with_reason(format!("'{file_path}' is a folder"))),
            },
            None => {
                level.push(FileTreeNode::file(*file_name, file_path, content));
                Ok(Upsert::Created)
            }
        }
    }

    /// Verifies, before any mutation, that no prefix of `segments` names a
    /// file and that the final segment does not name a folder.
    fn check_kinds(&self, path: &str, segments: &[&str]) -> Result<()> {
        let mut prefix = String::new();
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            prefix = format!("{prefix}/{segment}");
            let Some(node) = self.get(&prefix) else {
                return Ok(());
            };
            if i < last && node.is_file() {
                return Err(BuildError::invalid_path(path).with_reason(format!("'{prefix}' is a file")));
            }
            if i == last && node.is_folder() {
                return Err(
                    BuildError::invalid_path(path).with_reason(format!("'{prefix}' is a folder"))
                );
            }
        }
        Ok(())
    }
}

/// Iterator returned by [`FileTree::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a FileTreeNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a FileTreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
