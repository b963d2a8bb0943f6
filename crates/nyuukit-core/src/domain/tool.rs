use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// External executables the pipeline knows how to acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// The Nyuu poster binary.
    Poster,
    /// 7-Zip, used when in-process extraction cannot decode an archive.
    Archiver,
    /// par2cmdline, used to generate recovery files.
    Parity,
}

impl ToolKind {
    /// Directory name under the tool cache.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Poster => "nyuu",
            Self::Archiver => "7z",
            Self::Parity => "par2",
        }
    }

    /// Executable stems searched on PATH, most preferred first.
    pub const fn binary_names(self) -> &'static [&'static str] {
        match self {
            Self::Poster => &["nyuu"],
            Self::Archiver => &["7z", "7zz", "7za", "7zr"],
            Self::Parity => &["par2"],
        }
    }

    /// Stem of the executable placed in the tool cache.
    pub const fn cache_binary(self) -> &'static str {
        self.binary_names()[0]
    }

    /// Arguments for a quick no-op invocation used to verify a candidate.
    pub const fn probe_args(self) -> &'static [&'static str] {
        match self {
            Self::Poster => &["--version"],
            Self::Archiver => &["i"],
            Self::Parity => &["-V"],
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Poster => "Nyuu",
            Self::Archiver => "7-Zip",
            Self::Parity => "par2",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where a resolved executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOrigin {
    AlreadyInstalled,
    CachedLocalDownload,
    FreshlyProvisioned,
}

impl fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyInstalled => "already installed",
            Self::CachedLocalDownload => "cached download",
            Self::FreshlyProvisioned => "freshly provisioned",
        })
    }
}

/// A verified, runnable executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolHandle {
    pub tool: ToolKind,
    pub executable_path: PathBuf,
    pub origin: ToolOrigin,
}

impl ToolHandle {
    pub const fn new(tool: ToolKind, executable_path: PathBuf, origin: ToolOrigin) -> Self {
        Self {
            tool,
            executable_path,
            origin,
        }
    }

    /// Same executable, re-tagged with a different origin.
    #[must_use]
    pub fn with_origin(mut self, origin: ToolOrigin) -> Self {
        self.origin = origin;
        self
    }
}
