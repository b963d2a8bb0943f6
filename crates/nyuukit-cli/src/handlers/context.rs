//! Shared state for one CLI invocation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use nyuukit_core::paths::config_path;
use nyuukit_core::{EventSink, PosterSettings};
use nyuukit_runtime::{AcquisitionConfig, BinaryAcquisition};
use tokio::task::JoinHandle;

use crate::progress::spawn_renderer;

pub struct CliContext {
    pub config_path: PathBuf,
    pub settings: PosterSettings,
}

impl CliContext {
    /// Load settings from `config` or the default location.
    pub fn load(config: Option<PathBuf>) -> Result<Self> {
        let config_path = match config {
            Some(path) => path,
            None => config_path().context("Failed to resolve the default config path")?,
        };
        let settings = PosterSettings::load(&config_path)?;
        Ok(Self {
            config_path,
            settings,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.settings.save(&self.config_path)?;
        Ok(())
    }

    pub fn acquisition_config(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            auto_provision: self.settings.preparation.auto_provision,
            ..AcquisitionConfig::default()
        }
    }

    pub fn acquisition(&self, sink: Arc<dyn EventSink>) -> Result<BinaryAcquisition> {
        BinaryAcquisition::with_sink(self.acquisition_config(), sink)
            .context("Failed to initialise tool acquisition")
    }
}

/// A sink wired to a terminal renderer. Await the handle after every clone
/// of the sink has been dropped to flush remaining output.
pub fn progress_channel() -> (Arc<dyn EventSink>, JoinHandle<()>) {
    let (sink, rx) = nyuukit_core::event_channel();
    (Arc::new(sink), spawn_renderer(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_loads_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        let ctx = CliContext::load(Some(path.clone())).unwrap();
        assert_eq!(ctx.settings, PosterSettings::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_round_trips_and_feeds_acquisition() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let mut ctx = CliContext::load(Some(path.clone())).unwrap();
        ctx.settings.server.host = "news.example.com".to_string();
        ctx.settings.preparation.auto_provision = false;
        ctx.save().unwrap();

        let reloaded = CliContext::load(Some(path)).unwrap();
        assert_eq!(reloaded.settings.server.host, "news.example.com");
        assert!(!reloaded.acquisition_config().auto_provision);
    }
}
