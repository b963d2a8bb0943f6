//! End-to-end "get me a working copy of executable X".

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nyuukit_core::paths::downloads_dir;
use nyuukit_core::{
    EventSink, NoopSink, PipelineError, PipelineEvent, PlatformSelector, Stage, ToolHandle,
    ToolKind, ToolOrigin,
};
use reqwest::Client;
use tracing::{info, warn};

use super::asset::AssetResolver;
use super::extract::ArchiveExtractor;
use super::fetch::{DownloadTarget, FetchOptions, Fetcher};
use super::fsutil::{find_file, make_executable, swap_dir_into_place};
use super::instructions::install_instructions;
use super::locate::ToolLocator;
use super::provision::{StandaloneSource, ToolProvisioner, default_sources};
use super::release::{NYUU_LATEST_RELEASE_URL, ReleaseClient};

/// Anything that can hand out a runnable tool.
#[async_trait]
pub trait ToolResolver: Send + Sync {
    async fn resolve_tool(&self, tool: ToolKind) -> Result<ToolHandle, PipelineError>;
}

/// Knobs for `BinaryAcquisition`. Defaults use the data directory and the
/// real process environment.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub downloads_dir: Option<PathBuf>,
    pub tools_root: Option<PathBuf>,
    pub release_url: String,
    pub fetch: FetchOptions,
    pub auto_provision: bool,
    pub search_path: Option<OsString>,
    pub well_known: Option<Vec<PathBuf>>,
    pub sources: Option<HashMap<ToolKind, StandaloneSource>>,
    pub probe_timeout: Option<Duration>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            downloads_dir: None,
            tools_root: None,
            release_url: NYUU_LATEST_RELEASE_URL.to_string(),
            fetch: FetchOptions::default(),
            auto_provision: true,
            search_path: None,
            well_known: None,
            sources: None,
            probe_timeout: None,
        }
    }
}

/// Composes release lookup, fetch, extraction, location and provisioning.
pub struct BinaryAcquisition {
    releases: ReleaseClient,
    resolver: AssetResolver,
    fetcher: Fetcher,
    locator: ToolLocator,
    provisioner: Arc<ToolProvisioner>,
    extractor: ArchiveExtractor,
    downloads_dir: PathBuf,
    auto_provision: bool,
    sink: Arc<dyn EventSink>,
}

impl BinaryAcquisition {
    pub fn new(config: AcquisitionConfig) -> Result<Self, PipelineError> {
        Self::with_sink(config, Arc::new(NoopSink))
    }

    pub fn with_sink(
        config: AcquisitionConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, PipelineError> {
        let client = Client::new();
        let fetcher = Fetcher::new(client.clone(), config.fetch);

        let mut locator = ToolLocator::new();
        if let Some(root) = config.tools_root {
            locator = locator.with_cache_root(root);
        }
        if let Some(path) = config.search_path {
            locator = locator.with_search_path(path);
        }
        if let Some(paths) = config.well_known {
            locator = locator.with_well_known(paths);
        }
        if let Some(probe_timeout) = config.probe_timeout {
            locator = locator.with_probe_timeout(probe_timeout);
        }

        let provisioner = Arc::new(ToolProvisioner::with_sources(
            fetcher.clone(),
            locator.clone(),
            config.sources.unwrap_or_else(default_sources),
        ));
        let extractor = ArchiveExtractor::standard(
            locator.clone(),
            Arc::clone(&provisioner),
            config.auto_provision,
            Arc::clone(&sink),
        );

        let downloads_dir = match config.downloads_dir {
            Some(dir) => dir,
            None => downloads_dir()?,
        };

        Ok(Self {
            releases: ReleaseClient::new(client).with_url(config.release_url),
            resolver: AssetResolver::new(),
            fetcher,
            locator,
            provisioner,
            extractor,
            downloads_dir,
            auto_provision: config.auto_provision,
            sink,
        })
    }

    pub const fn locator(&self) -> &ToolLocator {
        &self.locator
    }

    pub const fn extractor(&self) -> &ArchiveExtractor {
        &self.extractor
    }

    pub fn provisioner(&self) -> &ToolProvisioner {
        &self.provisioner
    }

    /// Locate a helper tool, provisioning it when allowed.
    pub async fn acquire_tool(&self, tool: ToolKind) -> Result<ToolHandle, PipelineError> {
        self.sink
            .emit(PipelineEvent::started(Stage::Locate, format!("Looking for {tool}")));

        if let Some(handle) = self.locator.locate(tool).await {
            self.sink.emit(PipelineEvent::finished(
                Stage::Locate,
                format!("Using {} ({})", handle.executable_path.display(), handle.origin),
            ));
            return Ok(handle);
        }

        let instructions = install_instructions(tool);
        if tool == ToolKind::Poster || !self.auto_provision || !self.provisioner.supports(tool) {
            return Err(PipelineError::ToolUnavailable { tool, instructions });
        }

        match self.provisioner.provision(tool, self.sink.as_ref()).await {
            Ok(handle) => Ok(handle),
            Err(e) => Err(PipelineError::ToolUnavailable {
                tool,
                instructions: format!("Automatic download failed: {e}\n\n{instructions}"),
            }),
        }
    }

    /// Get a Nyuu executable for `selector`.
    ///
    /// A verified copy in the tool cache is reused unless `force` is set.
    pub async fn acquire_poster(
        &self,
        selector: PlatformSelector,
        force: bool,
    ) -> Result<ToolHandle, PipelineError> {
        if !force {
            if let Some(handle) = self.locator.locate_cached(ToolKind::Poster).await {
                info!(path = %handle.executable_path.display(), "Reusing cached Nyuu");
                return Ok(handle);
            }
        }

        self.sink.emit(PipelineEvent::started(
            Stage::Resolve,
            "Fetching latest release information",
        ));
        let release = self.releases.latest().await?;
        let asset = self.resolver.resolve(selector, &release)?;
        self.sink.emit(PipelineEvent::finished(
            Stage::Resolve,
            format!("Found {} in {}", asset.name, release.tag_name),
        ));

        let archive = self.downloads_dir.join(&asset.name);
        self.sink
            .emit(PipelineEvent::started(Stage::Fetch, format!("Downloading {}", asset.name)));
        let sink = Arc::clone(&self.sink);
        let progress = move |done: u64, total: Option<u64>| {
            sink.emit(PipelineEvent::bytes(Stage::Fetch, done, total));
        };
        let target = DownloadTarget {
            url: asset.download_url.clone(),
            destination_path: archive.clone(),
            expected_total_bytes: asset.size,
        };
        self.fetcher.fetch(&target, Some(&progress)).await?;
        self.sink.emit(PipelineEvent::finished(Stage::Fetch, "Download complete"));

        let outcome = self.extractor.extract(&archive).await;
        let _ = std::fs::remove_file(&archive);
        let outcome = outcome?;

        let exe = find_file(&outcome.extracted_directory, &["nyuu", "nyuu.exe"]).ok_or_else(|| {
            PipelineError::ProvisioningFailed {
                tool: ToolKind::Poster,
                reason: format!("{} does not contain a nyuu executable", asset.name),
            }
        })?;
        make_executable(&exe)?;

        if PlatformSelector::detect() != Some(selector) {
            // A foreign build cannot be verified here; leave it where it was extracted.
            warn!(%selector, path = %exe.display(), "Downloaded Nyuu for a different platform");
            return Ok(ToolHandle::new(ToolKind::Poster, exe, ToolOrigin::FreshlyProvisioned));
        }

        let handle = self.install_poster(&exe, &outcome.extracted_directory).await?;
        self.sink.emit(PipelineEvent::finished(
            Stage::Extract,
            format!("Nyuu ready at {}", handle.executable_path.display()),
        ));
        Ok(handle)
    }

    /// Move the directory holding `exe` into the tool cache and verify it.
    async fn install_poster(
        &self,
        exe: &Path,
        extracted: &Path,
    ) -> Result<ToolHandle, PipelineError> {
        // The cached copy stays untouched until the new build has run once.
        if !self.locator.verify(ToolKind::Poster, exe).await {
            let _ = std::fs::remove_dir_all(extracted);
            return Err(PipelineError::ProvisioningFailed {
                tool: ToolKind::Poster,
                reason: format!("downloaded {} did not run", exe.display()),
            });
        }

        let source_dir = exe.parent().unwrap_or(extracted);
        let cache_dir = self.locator.cache_dir(ToolKind::Poster)?;
        swap_dir_into_place(source_dir, &cache_dir)?;
        if extracted.exists() {
            let _ = std::fs::remove_dir_all(extracted);
        }

        match self.locator.locate_cached(ToolKind::Poster).await {
            Some(handle) => Ok(handle.with_origin(ToolOrigin::FreshlyProvisioned)),
            None => {
                let _ = std::fs::remove_dir_all(&cache_dir);
                Err(PipelineError::ProvisioningFailed {
                    tool: ToolKind::Poster,
                    reason: format!("{} did not run after installation", cache_dir.display()),
                })
            }
        }
    }
}

#[async_trait]
impl ToolResolver for BinaryAcquisition {
    async fn resolve_tool(&self, tool: ToolKind) -> Result<ToolHandle, PipelineError> {
        self.acquire_tool(tool).await
    }
}
