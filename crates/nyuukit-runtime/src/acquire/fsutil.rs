//! Small filesystem helpers shared by acquisition flows.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Depth-first search for a regular file whose name matches one of `names`.
///
/// Names compare case-insensitively. Shallower hits win over deeper ones.
pub fn find_file(root: &Path, names: &[&str]) -> Option<PathBuf> {
    let mut dirs = vec![root.to_path_buf()];
    while !dirs.is_empty() {
        let mut next = Vec::new();
        for dir in dirs {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            let mut entries: Vec<_> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
            entries.sort();
            for path in entries {
                if path.is_dir() {
                    next.push(path);
                } else if path.file_name().is_some_and(|n| {
                    let n = n.to_string_lossy();
                    names.iter().any(|want| n.eq_ignore_ascii_case(want))
                }) {
                    return Some(path);
                }
            }
        }
        dirs = next;
    }
    None
}

/// chmod 755 on unix, no-op elsewhere.
pub fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Replace `dest` with `src` (both directories on the same filesystem).
pub fn swap_dir_into_place(src: &Path, dest: &Path) -> io::Result<()> {
    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(src, dest)
}
