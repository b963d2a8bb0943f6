//! Deterministic fixed-size file splitting.
//!
//! Chunks are named `<file name>.001`, `<file name>.002`, ... and
//! concatenating them in order reproduces the source byte for byte. The
//! suffix widens past three digits when a split needs more than 999 chunks,
//! but every chunk of one split shares the same width.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nyuukit_core::{EventSink, NoopSink, PipelineError, PipelineEvent, SplitPlan, Stage};
use tracing::{debug, info};

const COPY_BUFFER: usize = 1024 * 1024;
const MIN_SUFFIX_WIDTH: usize = 3;

/// Path of the `index`-th chunk (1-based) of `source` inside `out_dir`,
/// zero-padded to `width` digits.
pub fn chunk_path(source: &Path, out_dir: &Path, index: u64, width: usize) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{name}.{index:0width$}"))
}

/// Suffix width for a split of `total` bytes into `chunk_size` chunks.
pub fn suffix_width(total: u64, chunk_size: u64) -> usize {
    let chunks = total.div_ceil(chunk_size.max(1));
    let digits = chunks.checked_ilog10().map_or(1, |d| d as usize + 1);
    digits.max(MIN_SUFFIX_WIDTH)
}

/// Split `source` into `chunk_size`-byte chunks.
///
/// `progress` receives the fraction of bytes written after every chunk.
/// On failure, chunks written so far are removed.
pub fn split_file(
    source: &Path,
    chunk_size: u64,
    output_dir: Option<&Path>,
    mut progress: impl FnMut(f64),
) -> Result<SplitPlan, PipelineError> {
    let failed = |reason: String| PipelineError::SplitFailed {
        path: source.to_path_buf(),
        reason,
    };

    if chunk_size == 0 {
        return Err(failed("chunk size must be greater than zero".to_string()));
    }

    let metadata = fs::metadata(source).map_err(|e| failed(e.to_string()))?;
    if !metadata.is_file() {
        return Err(failed("not a regular file".to_string()));
    }
    let total = metadata.len();

    if total <= chunk_size {
        debug!(path = %source.display(), total, chunk_size, "File fits in one chunk");
        progress(1.0);
        return Ok(SplitPlan::identity(source.to_path_buf(), chunk_size));
    }

    let out_dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    fs::create_dir_all(&out_dir).map_err(|e| failed(e.to_string()))?;

    let mut written_chunks = Vec::new();
    let result = write_chunks(source, chunk_size, total, &out_dir, &mut written_chunks, &mut progress);

    match result {
        Ok(()) => {
            info!(
                path = %source.display(),
                chunks = written_chunks.len(),
                chunk_size,
                "File split"
            );
            Ok(SplitPlan {
                source_file: source.to_path_buf(),
                chunk_size_bytes: chunk_size,
                chunk_paths: written_chunks,
            })
        }
        Err(e) => {
            for chunk in &written_chunks {
                let _ = fs::remove_file(chunk);
            }
            Err(failed(e.to_string()))
        }
    }
}

fn write_chunks(
    source: &Path,
    chunk_size: u64,
    total: u64,
    out_dir: &Path,
    written: &mut Vec<PathBuf>,
    progress: &mut impl FnMut(f64),
) -> std::io::Result<()> {
    let mut input = File::open(source)?;
    let mut buf = vec![0u8; COPY_BUFFER.min(usize::try_from(chunk_size).unwrap_or(COPY_BUFFER))];
    let width = suffix_width(total, chunk_size);
    let mut done: u64 = 0;
    let mut index = 1;

    while done < total {
        let path = chunk_path(source, out_dir, index, width);
        let mut out = BufWriter::new(File::create(&path)?);
        written.push(path);

        let mut remaining = chunk_size.min(total - done);
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
            let n = input.read(&mut buf[..want])?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "source shrank while splitting",
                ));
            }
            out.write_all(&buf[..n])?;
            remaining -= n as u64;
            done += n as u64;
        }
        out.flush()?;

        #[allow(clippy::cast_precision_loss)]
        progress(done as f64 / total as f64);
        index += 1;
    }

    Ok(())
}

/// Async wrapper that runs `split_file` off the runtime threads and reports
/// progress as pipeline events.
#[derive(Clone)]
pub struct FileSplitter {
    sink: Arc<dyn EventSink>,
}

impl Default for FileSplitter {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink))
    }
}

impl FileSplitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub async fn split(
        &self,
        source: &Path,
        chunk_size: u64,
        output_dir: Option<&Path>,
    ) -> Result<SplitPlan, PipelineError> {
        self.sink.emit(PipelineEvent::started(
            Stage::Split,
            format!("Splitting {}", source.display()),
        ));

        let source_owned = source.to_path_buf();
        let out_owned = output_dir.map(Path::to_path_buf);
        let sink = Arc::clone(&self.sink);

        let plan = tokio::task::spawn_blocking(move || {
            split_file(&source_owned, chunk_size, out_owned.as_deref(), |fraction| {
                sink.emit(PipelineEvent::fraction(Stage::Split, fraction));
            })
        })
        .await
        .map_err(|e| PipelineError::SplitFailed {
            path: source.to_path_buf(),
            reason: format!("split task panicked: {e}"),
        })??;

        let message = if plan.is_identity() {
            format!("{} is within the chunk size, kept as-is", source.display())
        } else {
            format!("{} split into {} chunks", source.display(), plan.chunk_paths.len())
        };
        self.sink.emit(PipelineEvent::finished(Stage::Split, message));
        Ok(plan)
    }
}
