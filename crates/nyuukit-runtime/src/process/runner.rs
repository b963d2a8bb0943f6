//! Process spawning and the running-process handle.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nyuukit_core::PipelineError;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::shutdown::{send_terminate, shutdown_child};
use super::stream::spawn_line_reader;

/// Grace period between SIGTERM and SIGKILL when a run is cancelled.
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// Spawns child processes with stdout and stderr merged into one line stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub const fn new() -> Self {
        Self
    }

    pub fn spawn(&self, spec: &CommandSpec) -> Result<RunningProcess, PipelineError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = spec.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to start {}: {e}", spec.program.display()),
            ))
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, "stdout", tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, "stderr", tx);
        }

        info!(
            program = %spec.program.display(),
            pid = ?child.id(),
            "Spawned child process"
        );

        Ok(RunningProcess {
            program: spec.program.clone(),
            child,
            lines: rx,
            running: Arc::new(AtomicBool::new(true)),
        })
    }
}

/// Owned handle to a spawned child.
///
/// Output is drained by background readers regardless of whether the caller
/// consumes `next_line`, so waiting never deadlocks on a full pipe.
#[derive(Debug)]
pub struct RunningProcess {
    program: PathBuf,
    child: Child,
    lines: mpsc::UnboundedReceiver<String>,
    running: Arc<AtomicBool>,
}

impl RunningProcess {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the process is still considered live by the caller.
    ///
    /// Becomes `false` as soon as `terminate` is called, even though the
    /// OS may take a moment to reap the child.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Next merged output line, or `None` once both streams hit EOF.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Request termination and mark the process as stopped.
    pub fn terminate(&mut self) -> Result<(), PipelineError> {
        self.running.store(false, Ordering::SeqCst);
        debug!(program = %self.program.display(), pid = ?self.child.id(), "Terminating child");
        send_terminate(&mut self.child).map_err(PipelineError::Io)
    }

    /// Wait for exit. Zero is success, anything else is `ProcessFailed`.
    pub async fn wait(&mut self) -> Result<(), PipelineError> {
        let status = self.child.wait().await?;
        self.running.store(false, Ordering::SeqCst);
        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::ProcessFailed(status.code()))
        }
    }

    /// Consume all output, then wait for exit.
    ///
    /// If `cancel` fires first, the child is terminated (with escalation)
    /// and `Cancelled` is returned.
    pub async fn drain<F>(
        &mut self,
        mut on_line: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), PipelineError>
    where
        F: FnMut(&str) + Send,
    {
        loop {
            tokio::select! {
                () = async {
                    match cancel {
                        Some(token) => token.cancelled().await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    self.running.store(false, Ordering::SeqCst);
                    if let Err(e) = shutdown_child(&mut self.child, CANCEL_GRACE).await {
                        warn!(program = %self.program.display(), error = %e, "Failed to stop child");
                    }
                    return Err(PipelineError::Cancelled);
                }

                line = self.lines.recv() => {
                    let Some(line) = line else { break; };
                    on_line(&line);
                }
            }
        }

        self.wait().await
    }
}
