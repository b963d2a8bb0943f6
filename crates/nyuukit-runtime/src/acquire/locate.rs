//! Finding an already-installed, working copy of a helper executable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use nyuukit_core::paths::{executable_name, tool_cache_dir};
use nyuukit_core::{PipelineError, ToolHandle, ToolKind, ToolOrigin};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Searches for tools in a fixed order:
///
/// 1. The local tool cache (previous provisioning or poster download)
/// 2. The process search path
/// 3. Well-known platform install locations
///
/// Every candidate is verified by running it with a no-op argument before
/// it is returned.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    cache_root: Option<PathBuf>,
    search_path: Option<OsString>,
    well_known: Option<Vec<PathBuf>>,
    probe_timeout: Duration,
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self {
            cache_root: None,
            search_path: None,
            well_known: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl ToolLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `root/<tool>/` instead of the data-dir tool cache.
    #[must_use]
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Search this PATH-style list instead of the process `PATH`.
    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Replace the built-in well-known locations (applies to every tool).
    #[must_use]
    pub fn with_well_known(mut self, paths: Vec<PathBuf>) -> Self {
        self.well_known = Some(paths);
        self
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Directory that provisioning writes into for `tool`.
    pub fn cache_dir(&self, tool: ToolKind) -> Result<PathBuf, PipelineError> {
        match self.cache_root {
            Some(ref root) => Ok(root.join(tool.slug())),
            None => Ok(tool_cache_dir(tool.slug())?),
        }
    }

    /// Well-known cache path checked first by `locate`.
    pub fn cache_path(&self, tool: ToolKind) -> Result<PathBuf, PipelineError> {
        Ok(self.cache_dir(tool)?.join(executable_name(tool.cache_binary())))
    }

    /// First verified hit, or `None`.
    pub async fn locate(&self, tool: ToolKind) -> Option<ToolHandle> {
        if let Some(handle) = self.locate_cached(tool).await {
            return Some(handle);
        }

        for name in tool.binary_names() {
            if let Some(path) = self.which(name) {
                if self.verify(tool, &path).await {
                    debug!(%tool, path = %path.display(), "Found tool on PATH");
                    return Some(ToolHandle::new(tool, path, ToolOrigin::AlreadyInstalled));
                }
            }
        }

        for path in self.well_known_paths(tool) {
            if path.is_file() && self.verify(tool, &path).await {
                debug!(%tool, path = %path.display(), "Found tool at well-known location");
                return Some(ToolHandle::new(tool, path, ToolOrigin::AlreadyInstalled));
            }
        }

        debug!(%tool, "Tool not found");
        None
    }

    /// Only the local cache, still verified.
    pub async fn locate_cached(&self, tool: ToolKind) -> Option<ToolHandle> {
        let path = self.cache_path(tool).ok()?;
        if path.is_file() && self.verify(tool, &path).await {
            debug!(%tool, path = %path.display(), "Found cached tool");
            return Some(ToolHandle::new(tool, path, ToolOrigin::CachedLocalDownload));
        }
        None
    }

    /// Run the tool's probe arguments and require it to exit within the timeout.
    ///
    /// Exit status is not inspected: several 7-Zip builds exit non-zero for
    /// informational commands, and a binary that runs at all is usable.
    pub async fn verify(&self, tool: ToolKind, path: &Path) -> bool {
        let spawned = Command::new(path)
            .args(tool.probe_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                debug!(%tool, path = %path.display(), error = %e, "Candidate failed to start");
                return false;
            }
        };

        match timeout(self.probe_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%tool, path = %path.display(), ?status, "Candidate responded");
                true
            }
            Ok(Err(e)) => {
                debug!(%tool, path = %path.display(), error = %e, "Candidate wait failed");
                false
            }
            Err(_) => {
                debug!(%tool, path = %path.display(), "Candidate probe timed out");
                let _ = child.kill().await;
                false
            }
        }
    }

    fn which(&self, name: &str) -> Option<PathBuf> {
        match self.search_path {
            Some(ref paths) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(name, Some(paths), cwd).ok()
            }
            None => which::which(name).ok(),
        }
    }

    fn well_known_paths(&self, tool: ToolKind) -> Vec<PathBuf> {
        self.well_known
            .clone()
            .unwrap_or_else(|| default_well_known(tool))
    }
}

fn default_well_known(tool: ToolKind) -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "windows") {
        match tool {
            ToolKind::Archiver => &[
                r"C:\Program Files\7-Zip\7z.exe",
                r"C:\Program Files (x86)\7-Zip\7z.exe",
            ],
            ToolKind::Parity => &[
                r"C:\Program Files\par2cmdline\par2.exe",
            ],
            ToolKind::Poster => &[],
        }
    } else if cfg!(target_os = "macos") {
        match tool {
            ToolKind::Archiver => &[
                "/opt/homebrew/bin/7zz",
                "/opt/homebrew/bin/7z",
                "/usr/local/bin/7zz",
                "/usr/local/bin/7z",
            ],
            ToolKind::Parity => &["/opt/homebrew/bin/par2", "/usr/local/bin/par2"],
            ToolKind::Poster => &["/opt/homebrew/bin/nyuu", "/usr/local/bin/nyuu"],
        }
    } else {
        match tool {
            ToolKind::Archiver => &[
                "/usr/bin/7z",
                "/usr/bin/7zz",
                "/usr/bin/7za",
                "/usr/local/bin/7z",
                "/usr/lib/p7zip/7z",
                "/snap/bin/7z",
            ],
            ToolKind::Parity => &["/usr/bin/par2", "/usr/local/bin/par2", "/snap/bin/par2"],
            ToolKind::Poster => &["/usr/local/bin/nyuu", "/usr/bin/nyuu"],
        }
    };
    paths.iter().map(PathBuf::from).collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::write_script;
    use tempfile::tempdir;

    fn isolated(cache: &Path, path_dir: &Path) -> ToolLocator {
        ToolLocator::new()
            .with_cache_root(cache)
            .with_search_path(path_dir.as_os_str())
            .with_well_known(Vec::new())
    }

    #[tokio::test]
    async fn nothing_found_is_none() {
        let tmp = tempdir().unwrap();
        let locator = isolated(&tmp.path().join("cache"), &tmp.path().join("bin"));
        assert!(locator.locate(ToolKind::Parity).await.is_none());
    }

    #[tokio::test]
    async fn cache_wins_over_path() {
        let tmp = tempdir().unwrap();
        let cache = tmp.path().join("cache");
        let bin = tmp.path().join("bin");
        write_script(&cache.join("par2").join("par2"), "exit 0");
        write_script(&bin.join("par2"), "exit 0");

        let handle = isolated(&cache, &bin).locate(ToolKind::Parity).await.unwrap();
        assert_eq!(handle.origin, ToolOrigin::CachedLocalDownload);
        assert_eq!(handle.executable_path, cache.join("par2").join("par2"));
    }

    #[tokio::test]
    async fn path_hit_is_already_installed() {
        let tmp = tempdir().unwrap();
        let bin = tmp.path().join("bin");
        write_script(&bin.join("7za"), "exit 0");

        let handle = isolated(&tmp.path().join("cache"), &bin)
            .locate(ToolKind::Archiver)
            .await
            .unwrap();
        assert_eq!(handle.origin, ToolOrigin::AlreadyInstalled);
        assert_eq!(handle.executable_path, bin.join("7za"));
    }

    #[tokio::test]
    async fn broken_cache_entry_is_skipped() {
        let tmp = tempdir().unwrap();
        let cache = tmp.path().join("cache");
        let bin = tmp.path().join("bin");
        // Present but not a runnable executable.
        std::fs::create_dir_all(cache.join("par2")).unwrap();
        std::fs::write(cache.join("par2").join("par2"), b"\x7fELF garbage").unwrap();
        write_script(&bin.join("par2"), "exit 0");

        let handle = isolated(&cache, &bin).locate(ToolKind::Parity).await.unwrap();
        assert_eq!(handle.origin, ToolOrigin::AlreadyInstalled);
    }

    #[tokio::test]
    async fn hanging_candidate_fails_verification() {
        let tmp = tempdir().unwrap();
        let bin = tmp.path().join("bin");
        write_script(&bin.join("par2"), "sleep 30");

        let locator = isolated(&tmp.path().join("cache"), &bin)
            .with_probe_timeout(Duration::from_millis(200));
        assert!(locator.locate(ToolKind::Parity).await.is_none());
    }

    #[tokio::test]
    async fn well_known_location_is_last_resort() {
        let tmp = tempdir().unwrap();
        let opt = tmp.path().join("opt/par2");
        write_script(&opt, "exit 0");

        let locator = ToolLocator::new()
            .with_cache_root(tmp.path().join("cache"))
            .with_search_path(tmp.path().join("empty").as_os_str())
            .with_well_known(vec![opt.clone()]);
        let handle = locator.locate(ToolKind::Parity).await.unwrap();
        assert_eq!(handle.executable_path, opt);
        assert_eq!(handle.origin, ToolOrigin::AlreadyInstalled);
    }
}
