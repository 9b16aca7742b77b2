//! Zip export of the file tree.

use std::io::{Cursor, Write};
use std::path::Path;

use log::{debug, info};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{
    error::{ArchiveResultExt, BuildError, Result},
    models::{FileTreeNode, NodeEntry},
    tree::FileTree,
};

/// Default file name for downloaded projects.
pub const DEFAULT_ARCHIVE_NAME: &str = "project.zip";

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: usize,
    pub folders: usize,
    pub bytes: usize,
}

/// Serializes the tree into an in-memory zip archive.
///
/// Entries use root-relative paths (`src/App.tsx`). Only files become
/// entries, empty ones included; folders are implied by the paths and the
/// tree never holds an empty one. The tree is only read.
pub fn export_zip(tree: &FileTree) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    write_nodes(&mut writer, tree.roots(), options)?;

    let cursor = writer.finish().archive_context("Failed to finalize archive")?;
    let bytes = cursor.into_inner();
    debug!(
        "Exported {} files into {} bytes",
        tree.file_count(),
        bytes.len()
    );
    Ok(bytes)
}

/// Exports the tree and writes the archive to `path`, creating parent
/// directories as needed.
pub fn export_to_path(tree: &FileTree, path: &Path) -> Result<ExportSummary> {
    let bytes = export_zip(tree)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::file_system(parent, e))?;
    }
    std::fs::write(path, &bytes).map_err(|e| BuildError::file_system(path, e))?;

    let summary = ExportSummary {
        files: tree.file_count(),
        folders: tree.folder_count(),
        bytes: bytes.len(),
    };
    info!("Wrote {} ({} files)", path.display(), summary.files);
    Ok(summary)
}

fn write_nodes<W: Write + std::io::Seek>(
    writer: &mut ZipWriter<W>,
    nodes: &[FileTreeNode],
    options: SimpleFileOptions,
) -> Result<()> {
    for node in nodes {
        let name = node.relative_path();
        match &node.entry {
            NodeEntry::File { content } => {
                writer
                    .start_file(name, options)
                    .archive_context(&format!("Failed to start entry '{name}'"))?;
                writer
                    .write_all(content.as_bytes())
                    .archive_context(&format!("Failed to write entry '{name}'"))?;
            }
            NodeEntry::Folder { children } => write_nodes(writer, children, options)?,
        }
    }
    Ok(())
}
