//! Event sink abstraction.

use tokio::sync::mpsc;

use super::PipelineEvent;

/// Receives pipeline events.
///
/// Implementations must not block: workers call `emit` from hot loops
/// (download chunks, split blocks, child output lines).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Forwards events into an unbounded channel.
///
/// A closed receiver is not an error; events are simply dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    pub const fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Create a sink together with the receiving end of its channel.
pub fn event_channel() -> (ChannelSink, mpsc::UnboundedReceiver<PipelineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Stage;
    use std::sync::Arc;

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = event_channel();
        sink.emit(PipelineEvent::line(Stage::Post, "one"));
        sink.emit(PipelineEvent::line(Stage::Post, "two"));

        assert_eq!(rx.recv().await.unwrap(), PipelineEvent::line(Stage::Post, "one"));
        assert_eq!(rx.recv().await.unwrap(), PipelineEvent::line(Stage::Post, "two"));
    }

    #[test]
    fn emit_after_receiver_dropped_is_silent() {
        let (sink, rx) = event_channel();
        drop(rx);
        sink.emit(PipelineEvent::started(Stage::Fetch, "ignored"));
    }

    #[test]
    fn noop_sink_behind_arc() {
        let sink: Arc<dyn EventSink> = Arc::new(NoopSink);
        sink.emit(PipelineEvent::started(Stage::Resolve, "x"));
    }
}
