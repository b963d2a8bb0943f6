use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Logical OS/architecture choice a user picks when fetching the poster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformSelector {
    LinuxX64,
    LinuxArm64,
    MacosX64,
    Windows32,
}

impl PlatformSelector {
    pub const ALL: [Self; 4] = [
        Self::LinuxX64,
        Self::LinuxArm64,
        Self::MacosX64,
        Self::Windows32,
    ];

    /// Human-readable label, as shown in platform pickers.
    pub const fn label(self) -> &'static str {
        match self {
            Self::LinuxX64 => "Linux x64",
            Self::LinuxArm64 => "Linux ARM64",
            Self::MacosX64 => "macOS x64",
            Self::Windows32 => "Windows 32-bit",
        }
    }

    /// Machine-friendly slug accepted on the command line.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::LinuxX64 => "linux-x64",
            Self::LinuxArm64 => "linux-arm64",
            Self::MacosX64 => "macos-x64",
            Self::Windows32 => "win32",
        }
    }

    /// Best match for the host this binary was compiled for.
    ///
    /// Windows always maps to the 32-bit build (the only Windows asset
    /// published) and Apple Silicon maps to the x64 build.
    pub const fn detect() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Self::Windows32)
        } else if cfg!(target_os = "macos") {
            Some(Self::MacosX64)
        } else if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
            Some(Self::LinuxX64)
        } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
            Some(Self::LinuxArm64)
        } else {
            None
        }
    }
}

impl fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlatformSelector {
    type Err = PipelineError;

    /// Accepts either the label ("Linux x64") or the slug ("linux-x64"),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(needle) || p.slug().eq_ignore_ascii_case(needle))
            .ok_or_else(|| PipelineError::UnknownSelector(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_slugs() {
        assert_eq!("Linux x64".parse::<PlatformSelector>().unwrap(), PlatformSelector::LinuxX64);
        assert_eq!("linux-arm64".parse::<PlatformSelector>().unwrap(), PlatformSelector::LinuxArm64);
        assert_eq!("MACOS X64".parse::<PlatformSelector>().unwrap(), PlatformSelector::MacosX64);
        assert_eq!("win32".parse::<PlatformSelector>().unwrap(), PlatformSelector::Windows32);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "Plan 9".parse::<PlatformSelector>().unwrap_err();
        assert!(matches!(err, PipelineError::UnknownSelector(ref s) if s == "Plan 9"));
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(PlatformSelector::Windows32.to_string(), "Windows 32-bit");
    }
}
