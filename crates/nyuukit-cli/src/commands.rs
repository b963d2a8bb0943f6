//! Subcommand definitions.

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use nyuukit_core::ToolKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Download Nyuu from the latest GitHub release and record its path
    Setup {
        /// Target platform (e.g. "Linux x64", "linux-arm64", "win32"); defaults to this machine
        #[arg(short, long)]
        platform: Option<String>,
        /// Download again even if a cached copy works
        #[arg(short, long)]
        force: bool,
    },

    /// Find or download helper tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },

    /// Extract an archive with the native → system 7-Zip → standalone 7-Zip chain
    Extract {
        /// Archive to extract
        archive: PathBuf,
        /// Extract here instead of next to the archive
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Split a file into numbered fixed-size chunks
    Split {
        file: PathBuf,
        /// Chunk size, e.g. 700M
        #[arg(short, long)]
        size: String,
        /// Output directory (defaults to the file's directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Create par2 recovery files
    Par2 {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Redundancy percentage (1-100); defaults to the configured value
        #[arg(short, long)]
        redundancy: Option<u8>,
        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Base name of the recovery files
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Prepare files and post them with Nyuu
    Post {
        /// Files or directories to upload
        files: Vec<PathBuf>,
        /// Print the command (password masked) instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ToolsCommand {
    /// Show where a tool would be taken from, without downloading
    Locate { tool: ToolArg },
    /// Download a standalone copy into the tool cache
    Provision { tool: HelperArg },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (password masked)
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ToolArg {
    Nyuu,
    #[value(name = "7z")]
    SevenZip,
    Par2,
}

impl From<ToolArg> for ToolKind {
    fn from(arg: ToolArg) -> Self {
        match arg {
            ToolArg::Nyuu => Self::Poster,
            ToolArg::SevenZip => Self::Archiver,
            ToolArg::Par2 => Self::Parity,
        }
    }
}

/// Tools that can be provisioned (the poster comes from `setup`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HelperArg {
    #[value(name = "7z")]
    SevenZip,
    Par2,
}

impl From<HelperArg> for ToolKind {
    fn from(arg: HelperArg) -> Self {
        match arg {
            HelperArg::SevenZip => Self::Archiver,
            HelperArg::Par2 => Self::Parity,
        }
    }
}
