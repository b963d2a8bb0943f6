//! Runtime pipeline for nyuukit.
//!
//! - [`acquire`] finds or downloads the poster and its helper tools
//! - [`prepare`] splits inputs and generates recovery files
//! - [`poster`] turns settings into a poster invocation
//! - [`process`] runs children with merged, cancellable output streaming
//! - [`job`] ties the above into one single-flight posting run
#![deny(unsafe_code)]

pub mod acquire;
pub mod job;
pub mod poster;
pub mod prepare;
pub mod process;

pub use acquire::{
    AcquisitionConfig, ArchiveExtractor, AssetResolver, BinaryAcquisition, DownloadTarget,
    ExtractionStrategy, FetchOptions, Fetcher, ReleaseClient, StrategyError, ToolLocator,
    ToolProvisioner, ToolResolver, install_instructions,
};
pub use job::{JobGuard, JobSlot, PosterJob};
pub use poster::PosterCommand;
pub use prepare::{FileSplitter, RecoveryRequest, RecoverySetGenerator};
pub use process::{CommandSpec, ProcessRunner, RunningProcess};
