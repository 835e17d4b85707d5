//! Pages directory scanning
//!
//! Walks a pages directory and returns every file whose stem is one of the
//! convention names. Directories starting with `_` (private) or `.` are not
//! entered. Other files are ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::tree::FileKind;

/// A convention file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Directory relative to the pages root, `/`-separated; empty for the root
    pub dir: String,
    pub kind: FileKind,
}

/// Scans `pages_dir` in a stable, sorted order
pub fn discover(pages_dir: impl AsRef<Path>) -> Result<Vec<DiscoveredFile>> {
    let pages_dir = pages_dir.as_ref();
    if !pages_dir.is_dir() {
        anyhow::bail!("Pages directory not found: {:?}", pages_dir);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(pages_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to scan {:?}", pages_dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(kind) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(FileKind::from_stem)
        else {
            debug!(path = %path.display(), "skipping non-convention file");
            continue;
        };

        let dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(pages_dir).ok())
            .map(|relative| {
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();

        files.push(DiscoveredFile {
            path: path.to_path_buf(),
            dir,
            kind,
        });
    }

    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('_') || name.starts_with('.'))
            .unwrap_or(false)
}
