//! Core domain types, events and configuration for nyuukit.
//!
//! This crate has no network or process dependencies. It defines the
//! vocabulary shared by the runtime pipeline and the CLI adapter:
//!
//! - [`domain`] - platform selectors, release assets, tool handles,
//!   extraction outcomes, split plans, recovery sets and job states
//! - [`error`] - the [`PipelineError`] taxonomy
//! - [`events`] - one-way progress events and sinks
//! - [`paths`] - data root and tool cache locations
//! - [`settings`] - persisted poster configuration

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod events;
pub mod paths;
pub mod settings;

pub use domain::{
    DescriptorAsset, DiagnosticTrail, ExtractionOutcome, ExtractionStrategyKind, JobState,
    PlatformSelector, RecoverySet, ReleaseAsset, ReleaseDescriptor, SplitPlan, StrategyFailure,
    ToolHandle, ToolKind, ToolOrigin,
};
pub use error::PipelineError;
pub use events::{ChannelSink, EventPayload, EventSink, NoopSink, PipelineEvent, Stage, event_channel};
pub use paths::PathError;
pub use settings::{PosterSettings, SettingsError, parse_size, validate_settings};
