//! `post`: prepare inputs and run Nyuu.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use nyuukit_core::{EventSink, PosterSettings, ToolKind};
use nyuukit_runtime::{JobSlot, PosterJob};
use tracing::debug;

use super::cancel_on_ctrl_c;
use super::context::{CliContext, progress_channel};

pub async fn execute(ctx: &CliContext, files: Vec<PathBuf>, dry_run: bool) -> Result<()> {
    let (sink, renderer) = progress_channel();
    let result = run(ctx, ctx.settings.clone(), files, dry_run, Arc::clone(&sink)).await;
    drop(sink);
    let _ = renderer.await;
    result
}

async fn run(
    ctx: &CliContext,
    mut settings: PosterSettings,
    files: Vec<PathBuf>,
    dry_run: bool,
    sink: Arc<dyn EventSink>,
) -> Result<()> {
    let acquisition = ctx.acquisition(Arc::clone(&sink))?;

    if settings.nyuu_path.is_none() {
        if let Some(handle) = acquisition.locator().locate(ToolKind::Poster).await {
            debug!(path = %handle.executable_path.display(), "Using located Nyuu");
            settings.nyuu_path = Some(handle.executable_path);
        }
    }

    let slot = JobSlot::new();
    let mut job =
        PosterJob::new(&slot, settings, files, Arc::new(acquisition))?.with_sink(sink);

    if dry_run {
        let command = job.command()?;
        let prep = &job.settings().preparation;
        if prep.split_enabled || prep.par2_enabled {
            println!("Note: split/par2 preparation is enabled; the real run posts the prepared files.\n");
        }
        println!("Command to execute:\n\n{}", command.masked());
        return Ok(());
    }

    cancel_on_ctrl_c(job.cancel_token());
    job.run().await.context("Upload failed")?;
    println!("Upload completed: {} file(s) posted", job.files().len());
    Ok(())
}
