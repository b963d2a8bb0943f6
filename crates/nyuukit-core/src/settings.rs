//! Persisted poster configuration.
//!
//! The configuration is a single JSON document grouped by concern. Every
//! section is `#[serde(default)]`, so files written by older versions (or
//! edited by hand) load with missing keys filled in.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default NNTP port.
pub const DEFAULT_PORT: u16 = 119;
/// Default NNTP-over-TLS port.
pub const DEFAULT_SSL_PORT: u16 = 563;
pub const DEFAULT_CONNECTIONS: u32 = 3;
pub const DEFAULT_ARTICLE_SIZE: &str = "700K";
pub const DEFAULT_REDUNDANCY_PERCENT: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub ignore_cert: bool,
    pub user: String,
    pub password: String,
    pub connections: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            ssl: false,
            ignore_cert: false,
            user: String::new(),
            password: String::new(),
            connections: DEFAULT_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingSettings {
    /// Passed to the poster verbatim, e.g. `700K`.
    pub article_size: String,
    pub comment: String,
    pub from: String,
    /// Comma-separated newsgroup list.
    pub groups: String,
}

impl Default for PostingSettings {
    fn default() -> Self {
        Self {
            article_size: DEFAULT_ARTICLE_SIZE.to_string(),
            comment: String::new(),
            from: String::new(),
            groups: String::new(),
        }
    }
}

impl PostingSettings {
    /// Newsgroups with whitespace trimmed and blanks dropped.
    pub fn group_list(&self) -> Vec<String> {
        self.groups
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Post-upload article verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    pub enabled: bool,
    pub connections: u32,
    pub tries: u32,
    pub delay: String,
    pub retry_delay: String,
    pub post_tries: u32,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            connections: 1,
            tries: 2,
            delay: "5s".to_string(),
            retry_delay: "30s".to_string(),
            post_tries: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NzbSettings {
    pub output: String,
    pub overwrite: bool,
    pub title: String,
    pub category: String,
    pub tag: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    pub skip_errors: bool,
    pub quiet: bool,
    pub recursive: bool,
    /// Extra poster arguments, split on whitespace.
    pub custom_args: String,
}

/// Splitting and recovery generation applied before posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationSettings {
    pub split_enabled: bool,
    /// Chunk size string, e.g. `700M`.
    pub split_size: String,
    pub par2_enabled: bool,
    pub par2_redundancy: u8,
    /// Where chunks and recovery files go; defaults to next to each input.
    pub work_dir: Option<PathBuf>,
    /// Download standalone helper tools when none is installed.
    pub auto_provision: bool,
}

impl Default for PreparationSettings {
    fn default() -> Self {
        Self {
            split_enabled: false,
            split_size: "700M".to_string(),
            par2_enabled: false,
            par2_redundancy: DEFAULT_REDUNDANCY_PERCENT,
            work_dir: None,
            auto_provision: true,
        }
    }
}

/// Complete poster configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterSettings {
    pub server: ServerSettings,
    pub posting: PostingSettings,
    pub verification: VerificationSettings,
    pub nzb: NzbSettings,
    pub advanced: AdvancedSettings,
    pub preparation: PreparationSettings,
    /// Resolved poster executable.
    pub nyuu_path: Option<PathBuf>,
}

impl PosterSettings {
    /// Load settings from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |e: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Toggle TLS, swapping the port between the two defaults.
    ///
    /// A custom port is left untouched.
    pub const fn set_ssl(&mut self, enabled: bool) {
        self.server.ssl = enabled;
        if enabled && self.server.port == DEFAULT_PORT {
            self.server.port = DEFAULT_SSL_PORT;
        } else if !enabled && self.server.port == DEFAULT_SSL_PORT {
            self.server.port = DEFAULT_PORT;
        }
    }

    /// Chunk size in bytes, if splitting is enabled.
    pub fn split_size_bytes(&self) -> Result<Option<u64>, SettingsError> {
        if !self.preparation.split_enabled {
            return Ok(None);
        }
        parse_size(&self.preparation.split_size).map(Some)
    }
}

/// Errors from loading, saving or validating settings.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access config file {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Config file {} is not valid: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid size '{0}' (expected a number with an optional K, M or G suffix)")]
    InvalidSize(String),

    #[error("Connections must be at least 1, got {0}")]
    InvalidConnections(u32),

    #[error("Redundancy must be between 1 and 100 percent, got {0}")]
    InvalidRedundancy(u8),
}

impl SettingsError {
    /// Settings field the error refers to, for validation reports.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Io { .. } | Self::Parse { .. } => "config",
            Self::InvalidSize(_) => "split_size",
            Self::InvalidConnections(_) => "connections",
            Self::InvalidRedundancy(_) => "par2_redundancy",
        }
    }
}

/// Validate values that the poster itself would not catch early.
pub fn validate_settings(settings: &PosterSettings) -> Result<(), SettingsError> {
    if settings.server.connections == 0 {
        return Err(SettingsError::InvalidConnections(0));
    }

    if settings.preparation.split_enabled {
        let size = parse_size(&settings.preparation.split_size)?;
        if size == 0 {
            return Err(SettingsError::InvalidSize(
                settings.preparation.split_size.clone(),
            ));
        }
    }

    if settings.preparation.par2_enabled {
        let pct = settings.preparation.par2_redundancy;
        if !(crate::domain::MIN_REDUNDANCY_PERCENT..=crate::domain::MAX_REDUNDANCY_PERCENT)
            .contains(&pct)
        {
            return Err(SettingsError::InvalidRedundancy(pct));
        }
    }

    Ok(())
}

/// Parse a size such as `700K`, `50M`, `2G` or `1048576` into bytes.
///
/// Suffixes are binary multiples and case-insensitive; a trailing `B` is allowed.
pub fn parse_size(raw: &str) -> Result<u64, SettingsError> {
    let invalid = || SettingsError::InvalidSize(raw.to_string());

    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_suffix(['b', 'B'])
        .filter(|rest| rest.ends_with(|c: char| c.is_ascii_alphabetic()))
        .unwrap_or(trimmed);

    let (digits, multiplier) = match trimmed.chars().last() {
        Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], 1024),
        Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some('g' | 'G') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    value.checked_mul(multiplier).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let s = PosterSettings::default();
        assert_eq!(s.server.port, 119);
        assert_eq!(s.server.connections, 3);
        assert_eq!(s.posting.article_size, "700K");
        assert_eq!(s.verification.connections, 1);
        assert_eq!(s.verification.tries, 2);
        assert_eq!(s.verification.delay, "5s");
        assert_eq!(s.verification.retry_delay, "30s");
        assert_eq!(s.verification.post_tries, 1);
        assert_eq!(s.preparation.par2_redundancy, 10);
        assert!(s.nyuu_path.is_none());
    }

    #[test]
    fn test_ssl_toggle_swaps_default_ports() {
        let mut s = PosterSettings::default();
        s.set_ssl(true);
        assert_eq!(s.server.port, 563);
        s.set_ssl(false);
        assert_eq!(s.server.port, 119);

        s.server.port = 8119;
        s.set_ssl(true);
        assert_eq!(s.server.port, 8119);
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/config.json");

        let mut s = PosterSettings::default();
        s.server.host = "news.example.com".to_string();
        s.posting.groups = "alt.binaries.test".to_string();
        s.save(&path).unwrap();

        let loaded = PosterSettings::load(&path).unwrap();
        assert_eq!(loaded, s);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let tmp = tempdir().unwrap();
        let loaded = PosterSettings::load(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(loaded, PosterSettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"host": "h"}, "nyuu_path": "/opt/nyuu"}"#).unwrap();

        let loaded = PosterSettings::load(&path).unwrap();
        assert_eq!(loaded.server.host, "h");
        assert_eq!(loaded.server.port, 119);
        assert_eq!(loaded.nyuu_path, Some(PathBuf::from("/opt/nyuu")));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            PosterSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_group_list() {
        let posting = PostingSettings {
            groups: " alt.binaries.test, ,alt.binaries.misc ".to_string(),
            ..PostingSettings::default()
        };
        assert_eq!(
            posting.group_list(),
            vec!["alt.binaries.test".to_string(), "alt.binaries.misc".to_string()]
        );
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100").unwrap(), 100);
        assert_eq!(parse_size("700K").unwrap(), 700 * 1024);
        assert_eq!(parse_size("50m").unwrap(), 50 * 1024 * 1024);
        assert_eq!(parse_size("2G").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("-5M").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_redundancy() {
        let mut s = PosterSettings::default();
        s.preparation.par2_enabled = true;
        s.preparation.par2_redundancy = 0;
        assert!(matches!(
            validate_settings(&s),
            Err(SettingsError::InvalidRedundancy(0))
        ));
    }

    #[test]
    fn test_validation_errors_name_their_field() {
        let mut s = PosterSettings::default();
        s.server.connections = 0;
        assert_eq!(validate_settings(&s).unwrap_err().field(), "connections");
        assert_eq!(SettingsError::InvalidSize("0".into()).field(), "split_size");
    }

    #[test]
    fn test_validate_rejects_zero_split() {
        let mut s = PosterSettings::default();
        s.preparation.split_enabled = true;
        s.preparation.split_size = "0".to_string();
        assert!(validate_settings(&s).is_err());
        s.preparation.split_size = "1M".to_string();
        assert!(validate_settings(&s).is_ok());
        assert_eq!(s.split_size_bytes().unwrap(), Some(1024 * 1024));
    }
}
