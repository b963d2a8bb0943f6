//! GitHub release descriptor lookup.

use std::time::Duration;

use nyuukit_core::{PipelineError, ReleaseDescriptor};
use reqwest::Client;
use tracing::debug;

/// Latest Nyuu release on GitHub.
pub const NYUU_LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/animetosho/Nyuu/releases/latest";

const RELEASE_INFO_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const USER_AGENT: &str = concat!("nyuukit/", env!("CARGO_PKG_VERSION"));

/// Fetches release descriptors from a GitHub-compatible endpoint.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl Default for ReleaseClient {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl ReleaseClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            url: NYUU_LATEST_RELEASE_URL.to_string(),
            timeout: RELEASE_INFO_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub async fn latest(&self) -> Result<ReleaseDescriptor, PipelineError> {
        debug!(url = %self.url, "Fetching release descriptor");

        let response = self
            .client
            .get(&self.url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.v3+json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::ReleaseFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::ReleaseFetchFailed(format!(
                "GitHub API returned {status}: {body}"
            )));
        }

        response
            .json::<ReleaseDescriptor>()
            .await
            .map_err(|e| PipelineError::ReleaseFetchFailed(format!("invalid release JSON: {e}")))
    }
}
