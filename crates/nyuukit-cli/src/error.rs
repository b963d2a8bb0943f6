//! Exit code mapping for failures that reach `main`.

use nyuukit_core::{PipelineError, SettingsError};
use thiserror::Error;

/// CLI-level error categories.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    General(String),

    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Process(String),

    #[error("{0}")]
    TryAgain(String),

    #[error("Cancelled")]
    Cancelled,
}

impl CliError {
    /// Map error to an exit code (sysexits.h where one fits).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::General(_) => 1,
            Self::Arguments(_) => 2,
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Network(_) => 68,     // EX_NOHOST
            Self::Io(_) => 74,          // EX_IOERR
            Self::Config(_) => 78,      // EX_CONFIG
            Self::Process(_) => 71,     // EX_OSERR
            Self::TryAgain(_) => 75,    // EX_TEMPFAIL
            Self::Cancelled => 130,
        }
    }

    /// Classify an error chain produced by a handler.
    pub fn classify(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if let Some(pipeline) = err.chain().find_map(|e| e.downcast_ref::<PipelineError>()) {
            return Self::from_pipeline(pipeline, message);
        }
        if err.chain().any(|e| e.downcast_ref::<SettingsError>().is_some()) {
            return Self::Config(message);
        }
        if err.chain().any(|e| e.downcast_ref::<std::io::Error>().is_some()) {
            return Self::Io(message);
        }
        Self::General(message)
    }

    fn from_pipeline(err: &PipelineError, message: String) -> Self {
        match err {
            PipelineError::ValidationFailed { .. } | PipelineError::UnknownSelector(_) => {
                Self::Arguments(message)
            }
            PipelineError::ToolUnavailable { .. } | PipelineError::AssetNotFound { .. } => {
                Self::Unavailable(message)
            }
            PipelineError::ReleaseFetchFailed(_)
            | PipelineError::DownloadFailed { .. }
            | PipelineError::DownloadTimeout { .. } => Self::Network(message),
            PipelineError::ProcessFailed(_) | PipelineError::RecoveryGenerationFailed { .. } => {
                Self::Process(message)
            }
            PipelineError::Busy => Self::TryAgain(message),
            PipelineError::Cancelled => Self::Cancelled,
            PipelineError::Io(_) | PipelineError::Path(_) | PipelineError::SplitFailed { .. } => {
                Self::Io(message)
            }
            PipelineError::ExtractionFailed { .. }
            | PipelineError::ProvisioningFailed { .. }
            | PipelineError::RecoveryOutputMissing { .. } => Self::General(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use nyuukit_core::ToolKind;

    #[test]
    fn test_validation_is_usage_error() {
        let err = anyhow::Error::new(PipelineError::validation("host", "Server host is required"));
        let cli = CliError::classify(&err);
        assert_eq!(cli.exit_code(), 2);
        assert!(cli.to_string().contains("Server host is required"));
    }

    #[test]
    fn test_context_does_not_hide_cause() {
        let err = Err::<(), _>(PipelineError::ToolUnavailable {
            tool: ToolKind::Parity,
            instructions: "apt install par2".to_string(),
        })
        .context("Creating recovery files")
        .unwrap_err();
        assert_eq!(CliError::classify(&err).exit_code(), 69);
    }

    #[test]
    fn test_cancelled_and_unknown() {
        assert_eq!(
            CliError::classify(&anyhow::Error::new(PipelineError::Cancelled)).exit_code(),
            130
        );
        assert_eq!(CliError::classify(&anyhow::anyhow!("boom")).exit_code(), 1);
    }
}
