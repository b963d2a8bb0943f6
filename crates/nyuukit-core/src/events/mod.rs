//! Progress and log events emitted by the pipeline.
//!
//! Events flow one way, from workers to whatever surface is listening. They
//! are advisory: dropping them never changes the outcome of a stage.
//!
//! # Wire Format
//!
//! ```json
//! { "stage": "fetch", "payload": { "type": "bytes", "done": 8192, "total": 65536 } }
//! ```

mod sink;

use serde::{Deserialize, Serialize};

pub use sink::{ChannelSink, EventSink, NoopSink, event_channel};

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    Fetch,
    Extract,
    Locate,
    Provision,
    Split,
    Recovery,
    Post,
}

/// What happened within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Started { message: String },
    /// Byte progress of a transfer.
    Bytes { done: u64, total: Option<u64> },
    /// Fractional completion in `[0.0, 1.0]`.
    Fraction { value: f64 },
    /// A line of child process output.
    Line { text: String },
    /// A fallback tier failed and the next one is about to run.
    StrategyFailed { strategy: String, message: String },
    Finished { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub stage: Stage,
    pub payload: EventPayload,
}

impl PipelineEvent {
    pub const fn new(stage: Stage, payload: EventPayload) -> Self {
        Self { stage, payload }
    }

    pub fn started(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(
            stage,
            EventPayload::Started {
                message: message.into(),
            },
        )
    }

    pub fn finished(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(
            stage,
            EventPayload::Finished {
                message: message.into(),
            },
        )
    }

    pub const fn bytes(stage: Stage, done: u64, total: Option<u64>) -> Self {
        Self::new(stage, EventPayload::Bytes { done, total })
    }

    pub fn fraction(stage: Stage, value: f64) -> Self {
        Self::new(
            stage,
            EventPayload::Fraction {
                value: value.clamp(0.0, 1.0),
            },
        )
    }

    pub fn line(stage: Stage, text: impl Into<String>) -> Self {
        Self::new(stage, EventPayload::Line { text: text.into() })
    }
}
