//! Last-resort extraction: download a standalone 7-Zip, then run it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use nyuukit_core::{EventSink, ExtractionStrategyKind, NoopSink, ToolKind};

use super::system::run_archiver;
use super::{ExtractionStrategy, StrategyError};
use crate::acquire::locate::ToolLocator;
use crate::acquire::provision::ToolProvisioner;

pub struct ProvisionedToolExtractor {
    locator: ToolLocator,
    provisioner: Arc<ToolProvisioner>,
    enabled: bool,
    sink: Arc<dyn EventSink>,
}

impl ProvisionedToolExtractor {
    pub fn new(locator: ToolLocator, provisioner: Arc<ToolProvisioner>, enabled: bool) -> Self {
        Self {
            locator,
            provisioner,
            enabled,
            sink: Arc::new(NoopSink),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }
}

#[async_trait]
impl ExtractionStrategy for ProvisionedToolExtractor {
    fn kind(&self) -> ExtractionStrategyKind {
        ExtractionStrategyKind::ProvisionedTool
    }

    async fn extract(&self, archive: &Path, target: &Path) -> Result<(), StrategyError> {
        if !self.enabled {
            return Err(StrategyError::Skipped(
                "automatic tool provisioning is disabled".to_string(),
            ));
        }

        // Only runs when no installed tool exists; a working 7-Zip that
        // already failed would fail the same way after provisioning.
        if self.locator.locate(ToolKind::Archiver).await.is_some() {
            return Err(StrategyError::Skipped(
                "an installed 7-Zip is present, provisioning another copy would not help"
                    .to_string(),
            ));
        }

        if !self.provisioner.supports(ToolKind::Archiver) {
            return Err(StrategyError::Skipped(format!(
                "no standalone 7-Zip is known for {}",
                std::env::consts::OS
            )));
        }

        let handle = self
            .provisioner
            .provision(ToolKind::Archiver, self.sink.as_ref())
            .await
            .map_err(|e| StrategyError::Failed(e.to_string()))?;

        run_archiver(&handle.executable_path, archive, target).await
    }
}
