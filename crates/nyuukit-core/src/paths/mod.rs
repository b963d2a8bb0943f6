//! Path utilities for nyuukit data directories.
//!
//! This module provides the canonical path resolution for all nyuukit components:
//! - Data root and the persisted configuration file
//! - Download staging directory
//! - Per-tool cache directories for provisioned helper binaries
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately

mod ensure;
mod error;
mod platform;
mod tools;

#[cfg(test)]
pub(crate) mod test_utils;

pub use ensure::{DirectoryCreationStrategy, ensure_directory};
pub use error::PathError;
pub use platform::{DATA_DIR_ENV, config_path, data_root, downloads_dir};
pub use tools::{executable_name, tool_cache_dir, tool_cache_path, tools_root};
