//! Platform → release asset resolution.

use nyuukit_core::{PipelineError, PlatformSelector, ReleaseAsset, ReleaseDescriptor};

/// Maps platform selectors to release assets by substring token.
///
/// Pure: no I/O, the descriptor is fetched elsewhere.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    tokens: Vec<(PlatformSelector, String)>,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::with_tokens([
            (PlatformSelector::LinuxX64, "linux-amd64"),
            (PlatformSelector::LinuxArm64, "linux-aarch64"),
            (PlatformSelector::MacosX64, "macos-x64"),
            (PlatformSelector::Windows32, "win32"),
        ])
    }
}

impl AssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (PlatformSelector, S)>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(|(p, t)| (p, t.into())).collect(),
        }
    }

    pub fn token_for(&self, selector: PlatformSelector) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(p, _)| *p == selector)
            .map(|(_, t)| t.as_str())
    }

    /// First asset whose name contains the selector's token.
    pub fn resolve(
        &self,
        selector: PlatformSelector,
        release: &ReleaseDescriptor,
    ) -> Result<ReleaseAsset, PipelineError> {
        let token = self
            .token_for(selector)
            .ok_or_else(|| PipelineError::UnknownSelector(selector.label().to_string()))?;

        release
            .assets
            .iter()
            .find(|asset| asset.name.contains(token))
            .map(|asset| ReleaseAsset {
                name: asset.name.clone(),
                download_url: asset.browser_download_url.clone(),
                os_selector: selector,
                size: (asset.size > 0).then_some(asset.size),
            })
            .ok_or_else(|| PipelineError::AssetNotFound {
                selector: selector.label().to_string(),
                token: token.to_string(),
            })
    }

    /// Resolve from a user-facing label such as "Linux x64".
    pub fn resolve_label(
        &self,
        label: &str,
        release: &ReleaseDescriptor,
    ) -> Result<ReleaseAsset, PipelineError> {
        let selector: PlatformSelector = label.parse()?;
        self.resolve(selector, release)
    }
}
