//! Extraction through an installed 7-Zip.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use nyuukit_core::{ExtractionStrategyKind, PipelineError, ToolKind};

use super::{ExtractionStrategy, StrategyError};
use crate::acquire::locate::ToolLocator;
use crate::process::{CommandSpec, ProcessRunner};

/// Lines of tool output kept for error messages.
const OUTPUT_TAIL: usize = 8;

#[derive(Debug, Clone)]
pub struct SystemToolExtractor {
    locator: ToolLocator,
}

impl SystemToolExtractor {
    pub const fn new(locator: ToolLocator) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl ExtractionStrategy for SystemToolExtractor {
    fn kind(&self) -> ExtractionStrategyKind {
        ExtractionStrategyKind::SystemTool
    }

    async fn extract(&self, archive: &Path, target: &Path) -> Result<(), StrategyError> {
        let handle = self.locator.locate(ToolKind::Archiver).await.ok_or_else(|| {
            StrategyError::ToolMissing(
                "no installed 7-Zip found (checked tool cache, PATH and well-known locations)"
                    .to_string(),
            )
        })?;

        run_archiver(&handle.executable_path, archive, target).await
    }
}

/// `7z x <archive> -o<target> -y`
pub(super) async fn run_archiver(
    exe: &Path,
    archive: &Path,
    target: &Path,
) -> Result<(), StrategyError> {
    let mut output_flag = std::ffi::OsString::from("-o");
    output_flag.push(target.as_os_str());

    let spec = CommandSpec::new(exe)
        .arg("x")
        .arg(archive.as_os_str())
        .arg(output_flag)
        .arg("-y");

    let mut process = ProcessRunner::new()
        .spawn(&spec)
        .map_err(|e| StrategyError::Failed(e.to_string()))?;

    let mut tail: VecDeque<String> = VecDeque::with_capacity(OUTPUT_TAIL);
    let result = process
        .drain(
            |line| {
                if line.trim().is_empty() {
                    return;
                }
                if tail.len() == OUTPUT_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            },
            None,
        )
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(PipelineError::ProcessFailed(code)) => {
            let code = code.map_or_else(|| "a signal".to_string(), |c| format!("exit code {c}"));
            let output = tail.into_iter().collect::<Vec<_>>().join(" | ");
            Err(StrategyError::Failed(format!(
                "{} failed with {code}: {output}",
                exe.display()
            )))
        }
        Err(e) => Err(StrategyError::Failed(e.to_string())),
    }
}
