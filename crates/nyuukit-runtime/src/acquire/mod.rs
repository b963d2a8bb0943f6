//! Tool acquisition: release lookup, download, extraction, location and
//! provisioning of the poster and its helper executables.

pub mod acquisition;
pub mod asset;
pub mod extract;
pub mod fetch;
mod fsutil;
pub mod instructions;
pub mod locate;
pub mod provision;
pub mod release;

pub use acquisition::{AcquisitionConfig, BinaryAcquisition, ToolResolver};
pub use asset::AssetResolver;
pub use extract::{ArchiveExtractor, ExtractionStrategy, StrategyError, extraction_dir};
pub use fetch::{DownloadTarget, FetchOptions, Fetcher};
pub use instructions::install_instructions;
pub use locate::ToolLocator;
pub use provision::{Packaging, StandaloneSource, ToolProvisioner};
pub use release::ReleaseClient;
