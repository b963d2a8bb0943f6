//! One posting run: prepare inputs, then run the poster to completion.
//!
//! A `JobSlot` enforces single-flight: while a `PosterJob` holds it, a second
//! job cannot be created. Preparation writes into shared staging paths, so
//! two concurrent runs would trample each other's chunks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nyuukit_core::{
    EventSink, JobState, NoopSink, PipelineError, PipelineEvent, PosterSettings, Stage,
    validate_settings,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::acquire::ToolResolver;
use crate::poster::PosterCommand;
use crate::prepare::{FileSplitter, RecoveryRequest, RecoverySetGenerator};
use crate::process::ProcessRunner;

/// Single-flight guard shared by everything that can start a job.
#[derive(Debug, Clone, Default)]
pub struct JobSlot {
    busy: Arc<AtomicBool>,
}

impl JobSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `Busy` if a job already holds it.
    pub fn try_acquire(&self) -> Result<JobGuard, PipelineError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::Busy)?;
        Ok(JobGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot on drop.
#[derive(Debug)]
pub struct JobGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A posting job over a fixed settings snapshot.
pub struct PosterJob {
    settings: PosterSettings,
    files: Vec<PathBuf>,
    state: JobState,
    resolver: Arc<dyn ToolResolver>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    runner: ProcessRunner,
    _guard: JobGuard,
}

impl PosterJob {
    pub fn new(
        slot: &JobSlot,
        settings: PosterSettings,
        files: Vec<PathBuf>,
        resolver: Arc<dyn ToolResolver>,
    ) -> Result<Self, PipelineError> {
        let guard = slot.try_acquire()?;
        Ok(Self {
            settings,
            files,
            state: JobState::Preparing,
            resolver,
            sink: Arc::new(NoopSink),
            cancel: CancellationToken::new(),
            runner: ProcessRunner::new(),
            _guard: guard,
        })
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub const fn state(&self) -> JobState {
        self.state
    }

    /// Current file list; replaced by the prepared list once preparation ran.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub const fn settings(&self) -> &PosterSettings {
        &self.settings
    }

    /// Token that cancels this job when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build the poster command for the current file list.
    pub fn command(&self) -> Result<PosterCommand, PipelineError> {
        PosterCommand::build(&self.settings, &self.files)
    }

    /// Split and protect inputs as configured, replacing the file list.
    ///
    /// Directories pass through untouched. Recovery data covers every
    /// regular file after splitting.
    pub async fn prepare(&mut self) -> Result<Vec<PathBuf>, PipelineError> {
        let prep = &self.settings.preparation;
        let chunk_size = self
            .settings
            .split_size_bytes()
            .map_err(|e| PipelineError::validation("split_size", e.to_string()))?;

        let mut prepared = Vec::with_capacity(self.files.len());
        let splitter = FileSplitter::new(Arc::clone(&self.sink));

        for file in &self.files {
            self.check_cancelled()?;
            match chunk_size {
                Some(size) if file.is_file() => {
                    let plan = splitter.split(file, size, prep.work_dir.as_deref()).await?;
                    prepared.extend(plan.output_files());
                }
                _ => prepared.push(file.clone()),
            }
        }

        if prep.par2_enabled {
            self.check_cancelled()?;
            let inputs: Vec<PathBuf> = prepared.iter().filter(|p| p.is_file()).cloned().collect();
            if inputs.is_empty() {
                warn!("No regular files to protect, skipping recovery generation");
            } else {
                let mut request = RecoveryRequest::new(inputs, prep.par2_redundancy);
                if let Some(dir) = &prep.work_dir {
                    request = request.output_dir(dir);
                }
                if let Some(name) = self.files.first().and_then(|f| recovery_basename(f)) {
                    request = request.basename(name);
                }

                let set = RecoverySetGenerator::new(Arc::clone(&self.resolver))
                    .with_sink(Arc::clone(&self.sink))
                    .generate(&request, Some(&self.cancel))
                    .await?;
                prepared.extend(set.recovery_files);
            }
        }

        debug!(before = self.files.len(), after = prepared.len(), "Prepared file list");
        self.files.clone_from(&prepared);
        Ok(prepared)
    }

    /// Run the whole job: validate, prepare, post.
    ///
    /// The returned error (if any) matches the terminal state: `Cancelled`
    /// for a cancelled job, anything else for a failed one.
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        let result = self.run_inner().await;
        let terminal = match &result {
            Ok(()) => JobState::Completed,
            Err(PipelineError::Cancelled) => JobState::Cancelled,
            Err(_) => JobState::Failed,
        };
        self.transition(terminal);
        result
    }

    async fn run_inner(&mut self) -> Result<(), PipelineError> {
        // Reject bad settings before spending time on preparation.
        validate_settings(&self.settings)
            .map_err(|e| PipelineError::validation(e.field(), e.to_string()))?;
        self.command()?;

        self.prepare().await?;
        self.check_cancelled()?;

        let command = self.command()?;
        self.transition(JobState::Running);

        self.sink.emit(PipelineEvent::started(
            Stage::Post,
            format!("Posting {} file(s)", self.files.len()),
        ));
        info!(files = self.files.len(), program = %command.program().display(), "Starting poster");

        let mut child = self.runner.spawn(&command.to_spec())?;
        let sink = Arc::clone(&self.sink);
        child
            .drain(
                |line| {
                    debug!(target: "nyuu", "{line}");
                    sink.emit(PipelineEvent::line(Stage::Post, line));
                },
                Some(&self.cancel),
            )
            .await?;

        self.sink
            .emit(PipelineEvent::finished(Stage::Post, "Upload completed"));
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: JobState) {
        if self.state.can_transition_to(next) {
            debug!(from = ?self.state, to = ?next, "Job state change");
            self.state = next;
        } else {
            warn!(from = ?self.state, to = ?next, "Ignoring invalid job state change");
        }
    }
}

fn recovery_basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nyuukit_core::{ToolHandle, ToolKind};
    use std::fs;
    use tempfile::tempdir;

    struct NoTools;

    #[async_trait]
    impl ToolResolver for NoTools {
        async fn resolve_tool(&self, tool: ToolKind) -> Result<ToolHandle, PipelineError> {
            Err(PipelineError::ToolUnavailable {
                tool,
                instructions: String::new(),
            })
        }
    }

    #[test]
    fn slot_is_single_flight() {
        let slot = JobSlot::new();
        let guard = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(matches!(slot.try_acquire(), Err(PipelineError::Busy)));
        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_ok());
    }

    #[test]
    fn second_job_is_busy() {
        let slot = JobSlot::new();
        let first = PosterJob::new(&slot, PosterSettings::default(), vec![], Arc::new(NoTools));
        assert!(first.is_ok());
        let second = PosterJob::new(&slot, PosterSettings::default(), vec![], Arc::new(NoTools));
        assert!(matches!(second, Err(PipelineError::Busy)));
    }

    #[tokio::test]
    async fn validation_failure_fails_without_preparing() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("big.bin");
        fs::write(&input, vec![0u8; 64]).unwrap();

        let mut settings = PosterSettings::default();
        settings.posting.groups = "alt.binaries.test".to_string();
        settings.preparation.split_enabled = true;
        settings.preparation.split_size = "16".to_string();

        let slot = JobSlot::new();
        let mut job = PosterJob::new(&slot, settings, vec![input], Arc::new(NoTools)).unwrap();
        let err = job.run().await.unwrap_err();

        assert_eq!(err.validation_field(), Some("host"));
        assert_eq!(job.state(), JobState::Failed);
        assert!(!tmp.path().join("big.bin.001").exists());
    }

    #[tokio::test]
    async fn invalid_settings_fail_before_preparing() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("big.bin");
        fs::write(&input, vec![0u8; 64]).unwrap();
        let nyuu = tmp.path().join("nyuu");
        fs::write(&nyuu, b"").unwrap();

        let mut base = PosterSettings::default();
        base.server.host = "news.example.com".to_string();
        base.posting.groups = "alt.binaries.test".to_string();
        base.nyuu_path = Some(nyuu);
        base.preparation.split_enabled = true;
        base.preparation.split_size = "16".to_string();

        let mut no_connections = base.clone();
        no_connections.server.connections = 0;
        let mut zero_split = base.clone();
        zero_split.preparation.split_size = "0".to_string();
        let mut bad_redundancy = base;
        bad_redundancy.preparation.par2_enabled = true;
        bad_redundancy.preparation.par2_redundancy = 0;

        for (settings, field) in [
            (no_connections, "connections"),
            (zero_split, "split_size"),
            (bad_redundancy, "par2_redundancy"),
        ] {
            let slot = JobSlot::new();
            let mut job =
                PosterJob::new(&slot, settings, vec![input.clone()], Arc::new(NoTools)).unwrap();
            let err = job.run().await.unwrap_err();

            assert_eq!(err.validation_field(), Some(field));
            assert_eq!(job.state(), JobState::Failed);
            assert!(!tmp.path().join("big.bin.001").exists());
        }
    }

    #[tokio::test]
    async fn prepare_splits_files_and_passes_directories() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("big.bin");
        fs::write(&input, vec![1u8; 40]).unwrap();
        let folder = tmp.path().join("folder");
        fs::create_dir(&folder).unwrap();
        let work = tmp.path().join("work");

        let mut settings = PosterSettings::default();
        settings.preparation.split_enabled = true;
        settings.preparation.split_size = "16".to_string();
        settings.preparation.work_dir = Some(work.clone());

        let slot = JobSlot::new();
        let mut job =
            PosterJob::new(&slot, settings, vec![input, folder.clone()], Arc::new(NoTools)).unwrap();
        let files = job.prepare().await.unwrap();

        assert_eq!(
            files,
            vec![
                work.join("big.bin.001"),
                work.join("big.bin.002"),
                work.join("big.bin.003"),
                folder,
            ]
        );
        assert_eq!(job.files(), files.as_slice());
    }

    #[tokio::test]
    async fn missing_par2_fails_preparation() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("a.bin");
        fs::write(&input, b"abc").unwrap();

        let mut settings = PosterSettings::default();
        settings.preparation.par2_enabled = true;

        let slot = JobSlot::new();
        let mut job = PosterJob::new(&slot, settings, vec![input], Arc::new(NoTools)).unwrap();
        let err = job.prepare().await.unwrap_err();
        assert!(matches!(err, PipelineError::ToolUnavailable { tool: ToolKind::Parity, .. }));
    }

    #[cfg(unix)]
    mod with_fake_poster {
        use super::*;
        use crate::testing::write_script;
        use std::time::Duration;

        fn job_with_poster(body: &str) -> (tempfile::TempDir, JobSlot, PosterJob) {
            let tmp = tempdir().unwrap();
            let nyuu = tmp.path().join("nyuu");
            write_script(&nyuu, body);
            let input = tmp.path().join("a.bin");
            fs::write(&input, b"payload").unwrap();

            let mut settings = PosterSettings::default();
            settings.server.host = "news.example.com".to_string();
            settings.posting.groups = "alt.binaries.test".to_string();
            settings.nyuu_path = Some(nyuu);

            let slot = JobSlot::new();
            let job = PosterJob::new(&slot, settings, vec![input], Arc::new(NoTools)).unwrap();
            (tmp, slot, job)
        }

        #[tokio::test]
        async fn streams_output_and_completes() {
            let (_tmp, slot, job) = job_with_poster("echo \"posting $2\"\necho done >&2\n");
            let (sink, mut rx) = nyuukit_core::event_channel();
            let mut job = job.with_sink(Arc::new(sink));

            job.run().await.unwrap();
            assert_eq!(job.state(), JobState::Completed);

            let mut lines = Vec::new();
            while let Ok(event) = rx.try_recv() {
                if let nyuukit_core::EventPayload::Line { text } = event.payload {
                    lines.push(text);
                }
            }
            lines.sort();
            assert_eq!(lines, vec!["done", "posting news.example.com"]);

            drop(job);
            assert!(!slot.is_busy());
        }

        #[tokio::test]
        async fn nonzero_exit_fails_job() {
            let (_tmp, _slot, mut job) = job_with_poster("exit 3\n");
            let err = job.run().await.unwrap_err();
            assert!(matches!(err, PipelineError::ProcessFailed(Some(3))));
            assert_eq!(job.state(), JobState::Failed);
        }

        #[tokio::test]
        async fn cancel_stops_running_poster() {
            let (_tmp, _slot, mut job) = job_with_poster("echo started\nsleep 30\n");
            let token = job.cancel_token();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                token.cancel();
            });

            let err = job.run().await.unwrap_err();
            assert!(matches!(err, PipelineError::Cancelled));
            assert_eq!(job.state(), JobState::Cancelled);
        }
    }
}
