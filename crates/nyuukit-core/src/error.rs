//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{DiagnosticTrail, ToolKind};
use crate::paths::PathError;

/// Structured failures surfaced by acquisition, preparation and posting.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No release asset matches {selector} (looked for '{token}' in asset names)")]
    AssetNotFound { selector: String, token: String },

    #[error("Unknown platform selector: {0}")]
    UnknownSelector(String),

    #[error("Failed to fetch release information: {0}")]
    ReleaseFetchFailed(String),

    #[error("Download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download of {url} timed out after {seconds}s")]
    DownloadTimeout { url: String, seconds: u64 },

    /// Every extraction strategy failed; the trail attributes each failure.
    #[error("Could not extract {}: {trail}", archive.display())]
    ExtractionFailed {
        archive: PathBuf,
        trail: DiagnosticTrail,
    },

    #[error("{tool} is not available.\n\n{instructions}")]
    ToolUnavailable { tool: ToolKind, instructions: String },

    #[error("Provisioning {tool} failed: {reason}")]
    ProvisioningFailed { tool: ToolKind, reason: String },

    #[error("Splitting {} failed: {reason}", path.display())]
    SplitFailed { path: PathBuf, reason: String },

    #[error("Recovery file generation failed ({})", describe_exit(.code))]
    RecoveryGenerationFailed { code: Option<i32> },

    #[error("Recovery tool succeeded but no '{basename}' recovery files were found in {}", dir.display())]
    RecoveryOutputMissing { basename: String, dir: PathBuf },

    #[error("Process failed ({})", describe_exit(.0))]
    ProcessFailed(Option<i32>),

    #[error("Invalid {field}: {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error("Another pipeline run is already in progress")]
    Busy,

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field name for validation failures, if this is one.
    pub fn validation_field(&self) -> Option<&str> {
        match self {
            Self::ValidationFailed { field, .. } => Some(field),
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
