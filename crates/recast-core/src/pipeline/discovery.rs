//! File discovery for finding images in directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SetupError;
use crate::types::SUPPORTED_EXTENSIONS;

/// Discovers image files in directory trees.
pub struct FileDiscovery {
    extensions: Vec<String>,
}

/// Information about a discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new(SUPPORTED_EXTENSIONS)
    }
}

impl FileDiscovery {
    /// Create a discovery instance matching the given extensions (with or without dot).
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Recursively find all supported files under `directory`.
    ///
    /// Matching ignores case, so `a.png`, `b.PNG` and `c.Png` are all found.
    /// Results are deduplicated and sorted by path.
    pub fn discover(&self, directory: &Path) -> Result<Vec<DiscoveredFile>, SetupError> {
        if !directory.exists() {
            return Err(SetupError::NotFound(directory.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(SetupError::NotADirectory(directory.to_path_buf()));
        }

        let mut found = BTreeMap::new();

        for entry in WalkDir::new(directory).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            let entry_path = entry.path();
            if entry.file_type().is_file() && self.is_supported(entry_path) {
                let size = file_size(entry_path, entry.metadata().map(|meta| meta.len()));
                found.insert(entry_path.to_path_buf(), size);
            }
        }

        Ok(found
            .into_iter()
            .map(|(path, size)| DiscoveredFile { path, size })
            .collect())
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext_lower)
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

/// Size from a metadata lookup. An unreadable file keeps size 0 so the
/// per-file stage reports it instead of dropping it here.
fn file_size<E: std::fmt::Display>(path: &Path, metadata: Result<u64, E>) -> u64 {
    metadata.unwrap_or_else(|e| {
        tracing::warn!("Cannot read metadata for {:?}: {e}", path);
        0
    })
}
