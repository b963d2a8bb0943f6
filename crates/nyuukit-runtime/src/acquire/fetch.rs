//! Streaming HTTP download to disk.
//!
//! Bytes are written to a temporary file next to the destination and
//! renamed into place only after the whole body arrived, so an interrupted
//! transfer never leaves a truncated file where a later step might trust it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use nyuukit_core::PipelineError;
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::time::timeout;
use tracing::{debug, info};

use super::release::USER_AGENT;

/// Progress granularity in bytes.
pub const BLOCK_SIZE: usize = 8192;

/// Default inactivity timeout for a transfer.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Progress callback, called with (`bytes_so_far`, `total_if_known`).
pub type FetchProgress<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// One transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    pub destination_path: PathBuf,
    pub expected_total_bytes: Option<u64>,
}

impl DownloadTarget {
    pub fn new(url: impl Into<String>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination_path: destination_path.into(),
            expected_total_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Applies to connecting and to every read; a stalled body times out.
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Streams URLs to local files.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    client: Client,
    options: FetchOptions,
}

impl Fetcher {
    pub fn new(client: Client, options: FetchOptions) -> Self {
        Self { client, options }
    }

    pub const fn options(&self) -> FetchOptions {
        self.options
    }

    /// Download `target`, returning the number of bytes written.
    pub async fn fetch(
        &self,
        target: &DownloadTarget,
        progress: Option<FetchProgress<'_>>,
    ) -> Result<u64, PipelineError> {
        let url = target.url.as_str();
        let dest = target.destination_path.as_path();
        let limit = self.options.timeout;

        let failed = |reason: String| PipelineError::DownloadFailed {
            url: url.to_string(),
            reason,
        };
        let timed_out = || PipelineError::DownloadTimeout {
            url: url.to_string(),
            seconds: limit.as_secs(),
        };

        debug!(%url, dest = %dest.display(), "Starting download");

        let response = timeout(
            limit,
            self.client.get(url).header("User-Agent", USER_AGENT).send(),
        )
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| {
            if e.is_timeout() {
                timed_out()
            } else {
                failed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let content_length = response.content_length();
        let total = content_length.or(target.expected_total_bytes);

        let mut file = create_staging_file(dest).map_err(|e| failed(e.to_string()))?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        loop {
            let next = timeout(limit, stream.next()).await.map_err(|_| timed_out())?;
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    timed_out()
                } else {
                    failed(format!("error reading download stream: {e}"))
                }
            })?;

            for block in chunk.chunks(BLOCK_SIZE) {
                file.write_all(block)
                    .map_err(|e| failed(format!("error writing download file: {e}")))?;
                downloaded += block.len() as u64;
                if let Some(cb) = progress {
                    cb(downloaded, total);
                }
            }
        }

        if let Some(expected) = content_length {
            if downloaded != expected {
                return Err(failed(format!(
                    "transfer ended after {downloaded} of {expected} bytes"
                )));
            }
        }

        file.flush().map_err(|e| failed(e.to_string()))?;
        file.persist(dest)
            .map_err(|e| failed(format!("failed to move download into place: {}", e.error)))?;

        info!(%url, bytes = downloaded, dest = %dest.display(), "Download complete");
        Ok(downloaded)
    }
}

fn create_staging_file(dest: &Path) -> std::io::Result<NamedTempFile> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    tempfile::Builder::new()
        .prefix(".nyuukit-download-")
        .suffix(".part")
        .tempfile_in(parent)
}
