use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The fallback tiers of archive extraction, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategyKind {
    NativeLibrary,
    SystemTool,
    ProvisionedTool,
}

impl fmt::Display for ExtractionStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NativeLibrary => "native_library",
            Self::SystemTool => "system_tool",
            Self::ProvisionedTool => "provisioned_tool",
        })
    }
}

/// One failed attempt, attributed to the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: ExtractionStrategyKind,
    pub message: String,
}

/// Ordered record of every strategy failure during one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticTrail(Vec<StrategyFailure>);

impl DiagnosticTrail {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, strategy: ExtractionStrategyKind, message: impl Into<String>) {
        self.0.push(StrategyFailure {
            strategy,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[StrategyFailure] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether a given strategy left an entry in the trail.
    pub fn mentions(&self, strategy: ExtractionStrategyKind) -> bool {
        self.0.iter().any(|f| f.strategy == strategy)
    }
}

impl fmt::Display for DiagnosticTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no extraction strategy was attempted");
        }
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "[{}] {}", failure.strategy, failure.message)?;
        }
        Ok(())
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub extracted_directory: PathBuf,
    pub strategy_used: ExtractionStrategyKind,
    /// Failures of the strategies tried before the winning one.
    pub diagnostic_trail: DiagnosticTrail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_display_attributes_every_failure() {
        let mut trail = DiagnosticTrail::new();
        trail.push(ExtractionStrategyKind::NativeLibrary, "unsupported format: 7z");
        trail.push(ExtractionStrategyKind::SystemTool, "7-Zip not found");

        let rendered = trail.to_string();
        assert_eq!(
            rendered,
            "[native_library] unsupported format: 7z; [system_tool] 7-Zip not found"
        );
        assert!(trail.mentions(ExtractionStrategyKind::SystemTool));
        assert!(!trail.mentions(ExtractionStrategyKind::ProvisionedTool));
    }
}
