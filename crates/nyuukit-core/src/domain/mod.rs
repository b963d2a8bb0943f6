//! Domain types for the acquisition and preparation pipeline.
//!
//! These types are pure data: no I/O, no process spawning. The runtime
//! crate owns every operation that produces or consumes them.

mod extraction;
mod job;
mod platform;
mod preparation;
mod release;
mod tool;

pub use extraction::{DiagnosticTrail, ExtractionOutcome, ExtractionStrategyKind, StrategyFailure};
pub use job::JobState;
pub use platform::PlatformSelector;
pub use preparation::{MAX_REDUNDANCY_PERCENT, MIN_REDUNDANCY_PERCENT, RecoverySet, SplitPlan};
pub use release::{DescriptorAsset, ReleaseAsset, ReleaseDescriptor};
pub use tool::{ToolHandle, ToolKind, ToolOrigin};
