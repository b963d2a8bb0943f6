use serde::{Deserialize, Serialize};

use super::platform::PlatformSelector;

/// Release metadata as returned by the GitHub "latest release" endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<DescriptorAsset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// A concrete asset chosen for a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    pub os_selector: PlatformSelector,
    /// Size advertised by the release, if non-zero.
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_github_payload() {
        let json = r#"{
            "tag_name": "v0.4.2",
            "name": "ignored",
            "assets": [
                {"name": "nyuu-v0.4.2-linux-amd64.tar.xz",
                 "browser_download_url": "https://example.invalid/a.tar.xz",
                 "size": 1234,
                 "content_type": "application/x-xz"}
            ]
        }"#;
        let release: ReleaseDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name, "v0.4.2");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].size, 1234);
    }

    #[test]
    fn missing_assets_defaults_to_empty() {
        let release: ReleaseDescriptor = serde_json::from_str(r#"{"tag_name":"v1"}"#).unwrap();
        assert!(release.assets.is_empty());
    }
}
