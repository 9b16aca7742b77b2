//! Projection of the file tree into the sandbox mount format.
//!
//! The sandbox expects a nested object keyed by node name:
//!
//! ```text
//! { "src": { "directory": { "App.tsx": { "file": { "contents": "..." } } } } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    models::{FileTreeNode, NodeEntry},
    tree::FileTree,
};

/// One entry of a mount descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountEntry {
    Directory(BTreeMap<String, MountEntry>),
    File { contents: String },
}

/// Full-tree mount descriptor handed to [`crate::sandbox::Sandbox::mount`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountDescriptor(pub BTreeMap<String, MountEntry>);

impl MountDescriptor {
    /// Builds the descriptor for a whole tree.
    pub fn from_tree(tree: &FileTree) -> Self {
        Self(project(tree.roots()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flattens the descriptor into `(relative path, entry)` pairs, depth
    /// first with siblings in name order. Directories are reported with
    /// `None`, files with their contents.
    pub fn flatten(&self) -> Vec<(String, Option<&str>)> {
        let mut out = Vec::new();
        flatten_into(&self.0, "", &mut out);
        out
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&FileTree> for MountDescriptor {
    fn from(tree: &FileTree) -> Self {
        Self::from_tree(tree)
    }
}

fn project(nodes: &[FileTreeNode]) -> BTreeMap<String, MountEntry> {
    nodes
        .iter()
        .map(|node| {
            let entry = match &node.entry {
                NodeEntry::File { content } => MountEntry::File {
                    contents: content.clone(),
                },
                NodeEntry::Folder { children } => MountEntry::Directory(project(children)),
            };
            (node.name.clone(), entry)
        })
        .collect()
}

fn flatten_into<'a>(
    entries: &'a BTreeMap<String, MountEntry>,
    prefix: &str,
    out: &mut Vec<(String, Option<&'a str>)>,
) {
    for (name, entry) in entries {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        match entry {
            MountEntry::File { contents } => out.push((path, Some(contents.as_str()))),
            MountEntry::Directory(children) => {
                out.push((path.clone(), None));
                flatten_into(children, &path, out);
            }
        }
    }
}
