//! Bulk ingestion of files from disk
//!
//! Traversal produces `(archive filename, disk path)` pairs; each file is then
//! read whole and handed to [`Archive::append_entry`] one at a time. Archive
//! filenames are relative to the ingested root and use forward slashes.

use crate::archive::{AppendOutcome, Archive, Entry};
use crate::error::{KresError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Traversal policy for [`ingest_path`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Descend into subdirectories instead of only taking the top level
    pub recurse: bool,
    /// Follow symbolic links; when unset, links are skipped
    pub follow_symlinks: bool,
}

impl IngestOptions {
    pub fn recursive() -> Self {
        Self {
            recurse: true,
            ..Self::default()
        }
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// Counts from one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub added: usize,
    pub unchanged: usize,
}

/// List the regular files under `root` with the archive filename each would get
///
/// A regular file yields itself, named by its final path component.
/// Results are sorted by path so ingestion order is reproducible.
pub fn collect_files(root: &Path, options: &IngestOptions) -> Result<Vec<(String, PathBuf)>> {
    let metadata =
        fs::metadata(root).map_err(|_| KresError::InvalidInputFile(root.to_path_buf()))?;

    if metadata.is_file() {
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| KresError::InvalidInputFile(root.to_path_buf()))?;
        return Ok(vec![(name.to_string(), root.to_path_buf())]);
    }
    if !metadata.is_dir() {
        return Err(KresError::InvalidInputFile(root.to_path_buf()));
    }

    let max_depth = if options.recurse { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = archive_name(root, entry.path())?;
        files.push((name, entry.into_path()));
    }
    Ok(files)
}

/// Archive filename of `path` relative to `root`, joined with `/`
fn archive_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| KresError::InvalidInputFile(path.to_path_buf()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| KresError::InvalidInputFile(path.to_path_buf()))?,
            ),
            _ => return Err(KresError::InvalidInputFile(path.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

/// Append every file found under `path` to `archive`
///
/// Stops at the first failure; files appended before it stay in the archive.
pub fn ingest_path(
    archive: &mut Archive,
    path: impl AsRef<Path>,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let path = path.as_ref();
    let mut report = IngestReport::default();

    for (name, disk_path) in collect_files(path, options)? {
        let data = fs::read(&disk_path)?;
        trace!("Ingesting {} as {:?}", disk_path.display(), name);
        match archive.append_entry(Entry::new(name, data)?)? {
            AppendOutcome::Added(_) => report.added += 1,
            AppendOutcome::Unchanged(_) => report.unchanged += 1,
        }
    }

    debug!(
        "Ingested {}: {} added, {} unchanged",
        path.display(),
        report.added,
        report.unchanged
    );
    Ok(report)
}

impl Archive {
    /// Append a file, or the files of a directory, from disk
    pub fn append_path(&mut self, path: impl AsRef<Path>, recurse: bool) -> Result<IngestReport> {
        let options = IngestOptions {
            recurse,
            ..IngestOptions::default()
        };
        ingest_path(self, path, &options)
    }
}
