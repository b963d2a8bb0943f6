//! Cache locations for provisioned helper binaries.
//!
//! Every tool gets its own directory under `<data_root>/tools/`, so a
//! provisioning run can stage into a sibling and swap it in as a whole.

use std::path::PathBuf;

use super::error::PathError;
use super::platform::data_root;

/// Root of the per-tool cache.
pub fn tools_root() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("tools"))
}

/// Cache directory for one tool, e.g. `<root>/tools/par2`.
pub fn tool_cache_dir(tool_slug: &str) -> Result<PathBuf, PathError> {
    Ok(tools_root()?.join(tool_slug))
}

/// Well-known cache path of a tool executable.
pub fn tool_cache_path(tool_slug: &str, binary_stem: &str) -> Result<PathBuf, PathError> {
    Ok(tool_cache_dir(tool_slug)?.join(executable_name(binary_stem)))
}

/// Platform-specific executable file name for a binary stem.
pub fn executable_name(stem: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::test_utils::DataDirOverride;

    #[test]
    fn tool_cache_path_is_nested_per_tool() {
        let _root = DataDirOverride::set("/tmp/nyuukit-tools");

        let path = tool_cache_path("par2", "par2").unwrap();
        assert!(path.starts_with("/tmp/nyuukit-tools/tools/par2"));

        #[cfg(target_os = "windows")]
        assert!(path.to_string_lossy().ends_with("par2.exe"));

        #[cfg(not(target_os = "windows"))]
        assert!(path.to_string_lossy().ends_with("par2"));
    }
}
