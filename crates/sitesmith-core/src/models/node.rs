//! File-tree node definitions.

use serde::{Deserialize, Serialize};

/// Discriminant of a [`FileTreeNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// Payload of a node: text for files, children for folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeEntry {
    File { content: String },
    Folder { children: Vec<FileTreeNode> },
}

/// One entry in the hierarchical project representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeNode {
    /// Final path segment
    pub name: String,

    /// Full path from the project root, always starting with `/`
    pub path: String,

    #[serde(flatten)]
    pub entry: NodeEntry,
}

impl FileTreeNode {
    /// Creates a file node.
    pub fn file(name: impl Into<String>, path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            entry: NodeEntry::File {
                content: content.into(),
            },
        }
    }

    /// Creates an empty folder node.
    pub fn folder(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            entry: NodeEntry::Folder {
                children: Vec::new(),
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.entry {
            NodeEntry::File { .. } => NodeKind::File,
            NodeEntry::Folder { .. } => NodeKind::Folder,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind() == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == NodeKind::Folder
    }

    /// File contents, `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match &self.entry {
            NodeEntry::File { content } => Some(content),
            NodeEntry::Folder { .. } => None,
        }
    }

    /// Child nodes; empty for files.
    pub fn children(&self) -> &[FileTreeNode] {
        match &self.entry {
            NodeEntry::Folder { children } => children,
            NodeEntry::File { .. } => &[],
        }
    }

    /// Path relative to the project root (no leading slash).
    pub fn relative_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}
