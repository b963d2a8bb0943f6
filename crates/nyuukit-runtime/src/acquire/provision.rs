//! Downloading standalone helper binaries into the tool cache.
//!
//! Provisioning is all-or-nothing. Everything is staged in a temporary
//! directory beside the cache and swapped in with a single rename; any
//! failure drops the staging directory, so a half-written tool never sits
//! where `ToolLocator` would find it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use nyuukit_core::paths::executable_name;
use nyuukit_core::{EventSink, PipelineError, PipelineEvent, Stage, ToolHandle, ToolKind, ToolOrigin};
use tracing::{info, warn};

use super::extract::NativeExtractor;
use super::fetch::{DownloadTarget, Fetcher};
use super::fsutil::{find_file, make_executable, swap_dir_into_place};
use super::locate::ToolLocator;

/// How a standalone build is packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packaging {
    /// The download is the executable itself.
    Executable,
    /// The download is an archive containing `binary_name`.
    Archive { binary_name: String },
}

/// Where to download a no-install build of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneSource {
    pub url: String,
    pub packaging: Packaging,
}

impl StandaloneSource {
    pub fn executable(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            packaging: Packaging::Executable,
        }
    }

    pub fn archive(url: impl Into<String>, binary_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            packaging: Packaging::Archive {
                binary_name: binary_name.into(),
            },
        }
    }
}

/// Standalone builds known for the current platform.
pub fn default_sources() -> HashMap<ToolKind, StandaloneSource> {
    let mut sources = HashMap::new();

    if cfg!(target_os = "windows") {
        sources.insert(
            ToolKind::Archiver,
            StandaloneSource::executable("https://www.7-zip.org/a/7zr.exe"),
        );
        sources.insert(
            ToolKind::Parity,
            StandaloneSource::archive(
                "https://github.com/Parchive/par2cmdline/releases/download/v0.8.1/par2cmdline-0.8.1-win-x64.zip",
                "par2.exe",
            ),
        );
    } else if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
        sources.insert(
            ToolKind::Archiver,
            StandaloneSource::archive("https://www.7-zip.org/a/7z2409-linux-x64.tar.xz", "7zz"),
        );
    } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
        sources.insert(
            ToolKind::Archiver,
            StandaloneSource::archive("https://www.7-zip.org/a/7z2409-linux-arm64.tar.xz", "7zz"),
        );
    }

    sources
}

/// Downloads and stages standalone tools.
#[derive(Debug, Clone)]
pub struct ToolProvisioner {
    fetcher: Fetcher,
    locator: ToolLocator,
    sources: HashMap<ToolKind, StandaloneSource>,
}

impl ToolProvisioner {
    pub fn new(fetcher: Fetcher, locator: ToolLocator) -> Self {
        Self::with_sources(fetcher, locator, default_sources())
    }

    pub const fn with_sources(
        fetcher: Fetcher,
        locator: ToolLocator,
        sources: HashMap<ToolKind, StandaloneSource>,
    ) -> Self {
        Self {
            fetcher,
            locator,
            sources,
        }
    }

    /// Whether a standalone build is known for `tool` on this platform.
    pub fn supports(&self, tool: ToolKind) -> bool {
        self.sources.contains_key(&tool)
    }

    /// Download, stage and verify `tool`, returning the cached handle.
    pub async fn provision(
        &self,
        tool: ToolKind,
        sink: &dyn EventSink,
    ) -> Result<ToolHandle, PipelineError> {
        let failed = |reason: String| PipelineError::ProvisioningFailed { tool, reason };

        let source = self.sources.get(&tool).ok_or_else(|| {
            failed(format!(
                "no standalone build is known for {}",
                std::env::consts::OS
            ))
        })?;

        sink.emit(PipelineEvent::started(
            Stage::Provision,
            format!("Downloading standalone {tool}"),
        ));

        let cache_dir = self.locator.cache_dir(tool)?;
        if let Err(reason) = self.stage_and_install(tool, source, &cache_dir, sink).await {
            warn!(%tool, %reason, "Provisioning failed");
            return Err(failed(reason));
        }

        let Some(handle) = self.locator.locate_cached(tool).await else {
            let _ = fs::remove_dir_all(&cache_dir);
            return Err(failed(
                "downloaded binary did not run on this system".to_string(),
            ));
        };

        info!(%tool, path = %handle.executable_path.display(), "Tool provisioned");
        sink.emit(PipelineEvent::finished(
            Stage::Provision,
            format!("{tool} ready at {}", handle.executable_path.display()),
        ));
        Ok(handle.with_origin(ToolOrigin::FreshlyProvisioned))
    }

    async fn stage_and_install(
        &self,
        tool: ToolKind,
        source: &StandaloneSource,
        cache_dir: &Path,
        sink: &dyn EventSink,
    ) -> Result<(), String> {
        let parent = cache_dir
            .parent()
            .ok_or_else(|| format!("invalid cache directory {}", cache_dir.display()))?;
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;

        // Removed on drop, including every early return below.
        let staging = tempfile::Builder::new()
            .prefix(&format!(".staging-{}-", tool.slug()))
            .tempdir_in(parent)
            .map_err(|e| format!("failed to create staging directory: {e}"))?;

        let file_name = source
            .url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("download");
        let download = staging.path().join(file_name);

        let progress = |done: u64, total: Option<u64>| {
            sink.emit(PipelineEvent::bytes(Stage::Provision, done, total));
        };
        self.fetcher
            .fetch(&DownloadTarget::new(&source.url, &download), Some(&progress))
            .await
            .map_err(|e| e.to_string())?;

        let install_dir = staging.path().join("install");
        fs::create_dir_all(&install_dir).map_err(|e| e.to_string())?;
        let installed = install_dir.join(executable_name(tool.cache_binary()));

        match source.packaging {
            Packaging::Executable => {
                fs::rename(&download, &installed).map_err(|e| e.to_string())?;
            }
            Packaging::Archive { ref binary_name } => {
                let unpack = staging.path().join("unpacked");
                fs::create_dir_all(&unpack).map_err(|e| e.to_string())?;

                let (archive, target) = (download.clone(), unpack.clone());
                tokio::task::spawn_blocking(move || {
                    NativeExtractor::extract_blocking(&archive, &target)
                })
                .await
                .map_err(|e| format!("extraction task panicked: {e}"))?
                .map_err(|e| format!("failed to unpack {file_name}: {e}"))?;

                let found = find_file(&unpack, &[binary_name.as_str()])
                    .ok_or_else(|| format!("{file_name} does not contain {binary_name}"))?;
                fs::rename(&found, &installed).map_err(|e| e.to_string())?;
            }
        }

        make_executable(&installed).map_err(|e| e.to_string())?;
        swap_dir_into_place(&install_dir, cache_dir)
            .map_err(|e| format!("failed to install into {}: {e}", cache_dir.display()))?;

        Ok(())
    }
}
