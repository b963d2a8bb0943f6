//! Directory creation helpers.

use std::fs;
use std::path::Path;

use super::error::PathError;

/// Strategy for how to handle missing directories when ensuring they exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryCreationStrategy {
    /// Create directories automatically if they are missing.
    #[default]
    AutoCreate,
    /// Do not create directories; return an error if missing.
    Disallow,
}

/// Ensure the provided directory exists according to the chosen strategy.
pub fn ensure_directory(path: &Path, strategy: DirectoryCreationStrategy) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }

    match strategy {
        DirectoryCreationStrategy::AutoCreate => {
            fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
        DirectoryCreationStrategy::Disallow => Err(PathError::DirectoryNotFound(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn auto_create_makes_nested_dirs() {
        let tmp = tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_directory(&nested, DirectoryCreationStrategy::AutoCreate).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn disallow_reports_missing_dir() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("missing");
        let err = ensure_directory(&missing, DirectoryCreationStrategy::Disallow).unwrap_err();
        assert!(matches!(err, PathError::DirectoryNotFound(_)));
    }

    #[test]
    fn file_is_not_a_directory() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        let err = ensure_directory(&file, DirectoryCreationStrategy::AutoCreate).unwrap_err();
        assert!(matches!(err, PathError::NotADirectory(_)));
    }
}
