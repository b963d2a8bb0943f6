//! Archive extraction with ordered fallback strategies.
//!
//! Strategies are tried in sequence. Each failure is appended to a
//! diagnostic trail before the next strategy runs, so the final error
//! carries every attempt rather than only the last one.
//!
//! The standard chain is:
//! 1. `NativeExtractor` - in-process zip / tar / tar.gz / tar.xz
//! 2. `SystemToolExtractor` - an installed 7-Zip
//! 3. `ProvisionedToolExtractor` - download a standalone 7-Zip, then retry (2)

mod native;
mod provisioned;
mod system;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use nyuukit_core::{
    DiagnosticTrail, EventPayload, EventSink, ExtractionOutcome, ExtractionStrategyKind, NoopSink,
    PipelineError, PipelineEvent, Stage,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use native::{ArchiveFormat, NativeExtractor, TarCompress, detect_format};
pub use provisioned::ProvisionedToolExtractor;
pub use system::SystemToolExtractor;

use super::locate::ToolLocator;
use super::provision::ToolProvisioner;

/// Why a single strategy could not extract an archive.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("unsupported archive format: {0}")]
    Unsupported(String),

    #[error("{0}")]
    ToolMissing(String),

    #[error("skipped: {0}")]
    Skipped(String),

    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One way of turning an archive into a directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> ExtractionStrategyKind;

    /// Extract `archive` into the existing, empty directory `target`.
    async fn extract(&self, archive: &Path, target: &Path) -> Result<(), StrategyError>;
}

/// Runs strategies in order until one succeeds.
pub struct ArchiveExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    sink: Arc<dyn EventSink>,
}

impl ArchiveExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self {
            strategies,
            sink: Arc::new(NoopSink),
        }
    }

    /// native → system 7-Zip → provisioned 7-Zip, all reporting to `sink`.
    pub fn standard(
        locator: ToolLocator,
        provisioner: Arc<ToolProvisioner>,
        auto_provision: bool,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let provisioned = ProvisionedToolExtractor::new(locator.clone(), provisioner, auto_provision)
            .with_sink(Arc::clone(&sink));
        Self::new(vec![
            Box::new(NativeExtractor),
            Box::new(SystemToolExtractor::new(locator)),
            Box::new(provisioned),
        ])
        .with_sink(sink)
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Extract next to the archive, into a directory named after its stem.
    pub async fn extract(&self, archive: &Path) -> Result<ExtractionOutcome, PipelineError> {
        let target = extraction_dir(archive);
        self.extract_into(archive, &target).await
    }

    /// Extract into `target`, replacing anything already there.
    pub async fn extract_into(
        &self,
        archive: &Path,
        target: &Path,
    ) -> Result<ExtractionOutcome, PipelineError> {
        self.sink.emit(PipelineEvent::started(
            Stage::Extract,
            format!("Extracting {}", archive.display()),
        ));

        let mut trail = DiagnosticTrail::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            reset_dir(target)?;

            debug!(strategy = %kind, archive = %archive.display(), "Trying extraction strategy");
            match strategy.extract(archive, target).await {
                Ok(()) => {
                    info!(strategy = %kind, target = %target.display(), "Archive extracted");
                    self.sink.emit(PipelineEvent::finished(
                        Stage::Extract,
                        format!("Extracted with {kind}"),
                    ));
                    return Ok(ExtractionOutcome {
                        extracted_directory: target.to_path_buf(),
                        strategy_used: kind,
                        diagnostic_trail: trail,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(strategy = %kind, error = %message, "Extraction strategy failed");
                    self.sink.emit(PipelineEvent::new(
                        Stage::Extract,
                        EventPayload::StrategyFailed {
                            strategy: kind.to_string(),
                            message: message.clone(),
                        },
                    ));
                    trail.push(kind, message);
                }
            }
        }

        let _ = std::fs::remove_dir_all(target);
        Err(PipelineError::ExtractionFailed {
            archive: archive.to_path_buf(),
            trail,
        })
    }
}

/// Target directory for an archive: its parent joined with the base name
/// stripped of archive extensions (`nyuu-linux.tar.xz` → `nyuu-linux`).
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let lower = name.to_ascii_lowercase();
    let stem_len = [
        ".tar.gz", ".tar.xz", ".tar.bz2", ".tar.zst", ".tgz", ".txz", ".tar", ".zip", ".7z",
    ]
    .iter()
    .find(|ext| lower.ends_with(*ext) && lower.len() > ext.len())
    .map_or_else(
        || {
            Path::new(&name)
                .file_stem()
                .map_or(name.len(), |s| s.len())
        },
        |ext| name.len() - ext.len(),
    );

    let parent = archive.parent().unwrap_or_else(|| Path::new(""));
    if stem_len == name.len() {
        // No extension to strip: the stem would be the archive itself.
        return parent.join(format!("{name}_extracted"));
    }
    parent.join(&name[..stem_len])
}

fn reset_dir(dir: &Path) -> Result<(), PipelineError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}
