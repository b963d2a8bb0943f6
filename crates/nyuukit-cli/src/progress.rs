//! Terminal rendering of pipeline events.
//!
//! One indicator is live at a time: a spinner while a stage has no measurable
//! progress, a bar once byte counts or fractions arrive. Child output lines
//! are printed above it.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use nyuukit_core::{EventPayload, PipelineEvent, Stage};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

const FRACTION_SCALE: u64 = 1000;

/// Render events until the sending side is dropped.
pub fn spawn_renderer(mut rx: UnboundedReceiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut renderer = Renderer::default();
        while let Some(event) = rx.recv().await {
            renderer.handle(event);
        }
        renderer.clear();
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Indicator {
    Spinner,
    Bytes,
    Fraction,
}

#[derive(Default)]
struct Renderer {
    current: Option<(ProgressBar, Indicator)>,
    message: String,
}

impl Renderer {
    fn handle(&mut self, event: PipelineEvent) {
        match event.payload {
            EventPayload::Started { message } => {
                self.clear();
                self.message = message;
                self.show(Indicator::Spinner);
            }
            EventPayload::Bytes { done, total } => {
                let bar = self.show(Indicator::Bytes);
                if let Some(total) = total {
                    bar.set_length(total);
                }
                bar.set_position(done);
            }
            EventPayload::Fraction { value } => {
                let bar = self.show(Indicator::Fraction);
                bar.set_position(fraction_position(value));
            }
            EventPayload::Line { text } => self.println(&text),
            EventPayload::StrategyFailed { strategy, message } => {
                self.println(&format!("  {strategy} failed: {message}"));
            }
            EventPayload::Finished { message } => {
                if let Some((bar, _)) = self.current.take() {
                    bar.finish_and_clear();
                }
                println!("{} {message}", stage_label(event.stage));
            }
        }
    }

    /// Make sure the live indicator is of `kind`, replacing it if needed.
    fn show(&mut self, kind: Indicator) -> &ProgressBar {
        if matches!(self.current, Some((_, current)) if current != kind) {
            self.clear();
        }
        let message = self.message.clone();
        &self
            .current
            .get_or_insert_with(|| {
                let bar = match kind {
                    Indicator::Spinner => spinner(),
                    Indicator::Bytes => byte_bar(),
                    Indicator::Fraction => fraction_bar(),
                };
                bar.set_message(message);
                (bar, kind)
            })
            .0
    }

    fn println(&self, text: &str) {
        match &self.current {
            Some((bar, _)) => bar.println(text),
            None => println!("{text}"),
        }
    }

    fn clear(&mut self) {
        if let Some((bar, _)) = self.current.take() {
            bar.finish_and_clear();
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn byte_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
    ) {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb
}

fn fraction_bar() -> ProgressBar {
    let pb = ProgressBar::new(FRACTION_SCALE);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fraction_position(value: f64) -> u64 {
    (value.clamp(0.0, 1.0) * FRACTION_SCALE as f64).round() as u64
}

const fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Resolve => "✓ [release]",
        Stage::Fetch => "✓ [download]",
        Stage::Extract => "✓ [extract]",
        Stage::Locate => "✓ [locate]",
        Stage::Provision => "✓ [provision]",
        Stage::Split => "✓ [split]",
        Stage::Recovery => "✓ [par2]",
        Stage::Post => "✓ [post]",
    }
}
