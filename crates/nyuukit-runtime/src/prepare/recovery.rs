//! par2 recovery set generation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nyuukit_core::domain::{MAX_REDUNDANCY_PERCENT, MIN_REDUNDANCY_PERCENT};
use nyuukit_core::paths::{DirectoryCreationStrategy, ensure_directory};
use nyuukit_core::{
    EventSink, NoopSink, PipelineError, PipelineEvent, RecoverySet, Stage, ToolKind,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::acquire::ToolResolver;
use crate::process::{CommandSpec, ProcessRunner};

/// What to protect and where the recovery files go.
#[derive(Debug, Clone)]
pub struct RecoveryRequest {
    pub files: Vec<PathBuf>,
    pub redundancy_percent: u8,
    /// Defaults to the directory of the first input.
    pub output_dir: Option<PathBuf>,
    /// Defaults to the file name of the first input.
    pub basename: Option<String>,
}

impl RecoveryRequest {
    pub fn new(files: Vec<PathBuf>, redundancy_percent: u8) -> Self {
        Self {
            files,
            redundancy_percent,
            output_dir: None,
            basename: None,
        }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn basename(mut self, name: impl Into<String>) -> Self {
        self.basename = Some(name.into());
        self
    }
}

/// Extract the last `NN.N%` marker from a line of par2 output.
pub fn parse_percent(line: &str) -> Option<f64> {
    let end = line.rfind('%')?;
    let head = &line[..end];
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
        .last()
        .map_or(head.len(), |(i, _)| i);
    let value: f64 = head[start..].parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value / 100.0)
}

/// Runs `par2 create` and collects what it produced.
pub struct RecoverySetGenerator {
    resolver: Arc<dyn ToolResolver>,
    runner: ProcessRunner,
    sink: Arc<dyn EventSink>,
}

impl RecoverySetGenerator {
    pub fn new(resolver: Arc<dyn ToolResolver>) -> Self {
        Self {
            resolver,
            runner: ProcessRunner::new(),
            sink: Arc::new(NoopSink),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub async fn generate(
        &self,
        request: &RecoveryRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<RecoverySet, PipelineError> {
        let percent = request.redundancy_percent;
        if !(MIN_REDUNDANCY_PERCENT..=MAX_REDUNDANCY_PERCENT).contains(&percent) {
            return Err(PipelineError::validation(
                "par2_redundancy",
                format!(
                    "must be between {MIN_REDUNDANCY_PERCENT} and {MAX_REDUNDANCY_PERCENT}, got {percent}"
                ),
            ));
        }
        let Some(first) = request.files.first() else {
            return Err(PipelineError::validation("files", "no input files"));
        };

        let inputs = request
            .files
            .iter()
            .map(fs::canonicalize)
            .collect::<Result<Vec<_>, _>>()?;

        let basename = match &request.basename {
            Some(name) => name.clone(),
            None => first
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| PipelineError::validation("files", "input has no file name"))?,
        };
        let output_dir = match &request.output_dir {
            Some(dir) => dir.clone(),
            None => inputs[0]
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        let par2 = self.resolver.resolve_tool(ToolKind::Parity).await?;

        ensure_directory(&output_dir, DirectoryCreationStrategy::AutoCreate)?;
        remove_stale_recovery_files(&output_dir, &basename)?;

        self.sink.emit(PipelineEvent::started(
            Stage::Recovery,
            format!("Creating {percent}% recovery data for {} file(s)", inputs.len()),
        ));

        let spec = CommandSpec::new(&par2.executable_path)
            .arg("create")
            .arg(format!("-r{percent}"))
            .arg(&basename)
            .args(&inputs)
            .current_dir(&output_dir);

        let mut child = self.runner.spawn(&spec)?;
        let sink = Arc::clone(&self.sink);
        let result = child
            .drain(
                |line| match parse_percent(line) {
                    Some(fraction) => sink.emit(PipelineEvent::fraction(Stage::Recovery, fraction)),
                    None => {
                        debug!(target: "par2", "{line}");
                        sink.emit(PipelineEvent::line(Stage::Recovery, line));
                    }
                },
                cancel,
            )
            .await;

        match result {
            Ok(()) => {}
            Err(PipelineError::ProcessFailed(code)) => {
                return Err(PipelineError::RecoveryGenerationFailed { code });
            }
            Err(e) => return Err(e),
        }

        let recovery_files = collect_recovery_files(&output_dir, &basename)?;
        if recovery_files.is_empty() {
            return Err(PipelineError::RecoveryOutputMissing {
                basename,
                dir: output_dir,
            });
        }

        info!(
            basename = %basename,
            files = recovery_files.len(),
            dir = %output_dir.display(),
            "Recovery set created"
        );
        self.sink.emit(PipelineEvent::finished(
            Stage::Recovery,
            format!("Created {} recovery file(s)", recovery_files.len()),
        ));

        Ok(RecoverySet {
            input_files: inputs,
            redundancy_percent: percent,
            recovery_files,
        })
    }
}

/// `<basename>.par2` first, then `<basename>.vol*.par2` sorted by name.
fn collect_recovery_files(dir: &Path, basename: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let index_name = format!("{basename}.par2");
    let volume_prefix = format!("{basename}.vol");

    let mut index = None;
    let mut volumes = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == index_name {
            index = Some(entry.path());
        } else if name.starts_with(&volume_prefix)
            && Path::new(&name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("par2"))
        {
            volumes.push(entry.path());
        }
    }
    volumes.sort();

    Ok(index.into_iter().chain(volumes).collect())
}

/// Recovery files for `basename` left over from an earlier run.
///
/// par2 refuses to overwrite an existing index, and leftovers would otherwise
/// be collected as this run's output.
fn remove_stale_recovery_files(dir: &Path, basename: &str) -> Result<(), PipelineError> {
    for stale in collect_recovery_files(dir, basename)? {
        warn!(path = %stale.display(), "Removing recovery file from a previous run");
        fs::remove_file(&stale)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nyuukit_core::{ToolHandle, ToolOrigin};
    use tempfile::tempdir;

    struct Unavailable;

    #[async_trait]
    impl ToolResolver for Unavailable {
        async fn resolve_tool(&self, tool: ToolKind) -> Result<ToolHandle, PipelineError> {
            Err(PipelineError::ToolUnavailable {
                tool,
                instructions: "install par2".to_string(),
            })
        }
    }

    #[test]
    fn parses_progress_markers() {
        assert_eq!(parse_percent("Processing: 45.0%"), Some(0.45));
        assert_eq!(parse_percent("Constructing: 100%"), Some(1.0));
        assert_eq!(parse_percent("Opening: a.bin"), None);
        assert_eq!(parse_percent("%"), None);
        assert_eq!(parse_percent("Redundancy: 250%"), None);
    }

    #[tokio::test]
    async fn rejects_bad_percent_before_lookup() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.bin");
        fs::write(&file, b"data").unwrap();

        let generator = RecoverySetGenerator::new(Arc::new(Unavailable));
        for percent in [0, 101] {
            let err = generator
                .generate(&RecoveryRequest::new(vec![file.clone()], percent), None)
                .await
                .unwrap_err();
            assert_eq!(err.validation_field(), Some("par2_redundancy"));
        }
    }

    #[tokio::test]
    async fn missing_tool_leaves_no_output() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.bin");
        fs::write(&file, b"data").unwrap();
        let out = tmp.path().join("par2");

        let err = RecoverySetGenerator::new(Arc::new(Unavailable))
            .generate(&RecoveryRequest::new(vec![file], 10).output_dir(&out), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::ToolUnavailable { tool: ToolKind::Parity, .. }));
        assert!(!out.exists());
    }

    #[test]
    fn collects_index_then_volumes() {
        let tmp = tempdir().unwrap();
        for name in [
            "show.par2",
            "show.vol03+02.par2",
            "show.vol00+01.par2",
            "other.par2",
            "show.mkv",
        ] {
            fs::write(tmp.path().join(name), b"").unwrap();
        }

        let files = collect_recovery_files(tmp.path(), "show").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["show.par2", "show.vol00+01.par2", "show.vol03+02.par2"]);
    }

    #[cfg(unix)]
    mod with_fake_par2 {
        use super::*;
        use crate::testing::write_script;

        struct Fixed(PathBuf);

        #[async_trait]
        impl ToolResolver for Fixed {
            async fn resolve_tool(&self, tool: ToolKind) -> Result<ToolHandle, PipelineError> {
                Ok(ToolHandle::new(tool, self.0.clone(), ToolOrigin::AlreadyInstalled))
            }
        }

        fn setup(body: &str) -> (tempfile::TempDir, RecoverySetGenerator, PathBuf) {
            let tmp = tempdir().unwrap();
            let script = tmp.path().join("bin/par2");
            write_script(&script, body);
            let input = tmp.path().join("data.bin");
            fs::write(&input, vec![7u8; 64]).unwrap();
            let generator = RecoverySetGenerator::new(Arc::new(Fixed(script)));
            (tmp, generator, input)
        }

        #[tokio::test]
        async fn produces_recovery_set() {
            let (tmp, generator, input) = setup(
                r#"[ "$1" = create ] || exit 2
[ "$2" = -r15 ] || exit 3
echo "Processing: 50.0%"
echo "Processing: 100.0%"
touch "$3.par2" "$3.vol00+01.par2"
"#,
            );
            let out = tmp.path().join("out");
            let (sink, mut rx) = nyuukit_core::event_channel();

            let set = generator
                .with_sink(Arc::new(sink))
                .generate(
                    &RecoveryRequest::new(vec![input], 15)
                        .output_dir(&out)
                        .basename("release"),
                    None,
                )
                .await
                .unwrap();

            assert_eq!(set.redundancy_percent, 15);
            assert_eq!(set.recovery_files.len(), 2);
            assert_eq!(set.recovery_files[0], out.join("release.par2"));

            let mut fractions = Vec::new();
            while let Ok(event) = rx.try_recv() {
                if let nyuukit_core::EventPayload::Fraction { value } = event.payload {
                    fractions.push(value);
                }
            }
            assert_eq!(fractions, vec![0.5, 1.0]);
        }

        #[tokio::test]
        async fn nonzero_exit_is_generation_failure() {
            let (_tmp, generator, input) = setup("echo 'bad input' >&2\nexit 4\n");
            let err = generator
                .generate(&RecoveryRequest::new(vec![input], 10), None)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                PipelineError::RecoveryGenerationFailed { code: Some(4) }
            ));
        }

        #[tokio::test]
        async fn leftovers_are_not_reported_as_output() {
            let (tmp, generator, input) = setup("exit 0\n");
            let stale = tmp.path().join("data.bin.par2");
            let stale_volume = tmp.path().join("data.bin.vol00+05.par2");
            fs::write(&stale, b"old").unwrap();
            fs::write(&stale_volume, b"old").unwrap();

            let err = generator
                .generate(&RecoveryRequest::new(vec![input], 10), None)
                .await
                .unwrap_err();

            assert!(matches!(err, PipelineError::RecoveryOutputMissing { .. }));
            assert!(!stale.exists());
            assert!(!stale_volume.exists());
        }

        #[tokio::test]
        async fn rerun_returns_only_fresh_volumes() {
            let (tmp, generator, input) = setup(
                r#"[ -e "$3.par2" ] && exit 5
touch "$3.par2" "$3.vol00+01.par2"
"#,
            );
            fs::write(tmp.path().join("data.bin.par2"), b"old").unwrap();
            fs::write(tmp.path().join("data.bin.vol00+08.par2"), b"old").unwrap();

            let set = generator
                .generate(&RecoveryRequest::new(vec![input], 10), None)
                .await
                .unwrap();

            let names: Vec<_> = set
                .recovery_files
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            assert_eq!(names, vec!["data.bin.par2", "data.bin.vol00+01.par2"]);
        }

        #[tokio::test]
        async fn success_without_output_is_missing() {
            let (_tmp, generator, input) = setup("exit 0\n");
            let err = generator
                .generate(&RecoveryRequest::new(vec![input], 10), None)
                .await
                .unwrap_err();
            assert!(matches!(err, PipelineError::RecoveryOutputMissing { .. }));
        }
    }
}
