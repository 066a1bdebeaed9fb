//! Collision-free output names.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

/// Pick an output path in `dir` that does not exist yet.
///
/// Tries `stem + extension` first, then `stem_1`, `stem_2`, ... Every candidate
/// is checked against the filesystem as it is now, so files written earlier
/// in the same batch are seen.
pub fn resolve(dir: &Path, stem: &OsStr, extension: &str) -> PipelineResult<PathBuf> {
    let mut candidate = dir.join(file_name(stem, None, extension));
    let mut counter: u64 = 1;

    while exists(dir, &candidate)? {
        candidate = dir.join(file_name(stem, Some(counter), extension));
        counter += 1;
    }

    Ok(candidate)
}

fn file_name(stem: &OsStr, counter: Option<u64>, extension: &str) -> OsString {
    let mut name = stem.to_os_string();
    if let Some(n) = counter {
        name.push(format!("_{n}"));
    }
    name.push(extension);
    name
}

fn exists(dir: &Path, candidate: &Path) -> PipelineResult<bool> {
    candidate
        .try_exists()
        .map_err(|source| PipelineError::Naming {
            dir: dir.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_free_name_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve(dir.path(), OsStr::new("photo"), ".jpg").unwrap();
        assert_eq!(path, dir.path().join("photo.jpg"));
        assert!(!path.exists());
    }

    #[test]
    fn test_collisions_count_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), b"existing").unwrap();

        let first = resolve(dir.path(), OsStr::new("photo"), ".jpg").unwrap();
        assert_eq!(first, dir.path().join("photo_1.jpg"));
        fs::write(&first, b"converted").unwrap();

        let second = resolve(dir.path(), OsStr::new("photo"), ".jpg").unwrap();
        assert_eq!(second, dir.path().join("photo_2.jpg"));

        // The pre-existing file is untouched
        assert_eq!(fs::read(dir.path().join("photo.jpg")).unwrap(), b"existing");
    }

    #[test]
    fn test_search_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scan.png"), b"").unwrap();
        fs::write(dir.path().join("scan_2.png"), b"").unwrap();

        let path = resolve(dir.path(), OsStr::new("scan"), ".png").unwrap();
        assert_eq!(path, dir.path().join("scan_1.png"));
    }

    #[test]
    fn test_other_extensions_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.png"), b"").unwrap();

        let path = resolve(dir.path(), OsStr::new("photo"), ".jpg").unwrap();
        assert_eq!(path, dir.path().join("photo.jpg"));
    }

    #[test]
    fn test_stem_with_dots() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("v1.2.final.webp"), b"").unwrap();

        let path = resolve(dir.path(), OsStr::new("v1.2.final"), ".webp").unwrap();
        assert_eq!(path, dir.path().join("v1.2.final_1.webp"));
    }
}
