//! `extract`: run the extraction chain on one archive.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};

use super::context::{CliContext, progress_channel};

pub async fn execute(ctx: &CliContext, archive: &Path, out: Option<&Path>) -> Result<()> {
    if !archive.is_file() {
        bail!("{} is not a file", archive.display());
    }

    let (sink, renderer) = progress_channel();
    let result = {
        let acquisition = ctx.acquisition(Arc::clone(&sink))?;
        match out {
            Some(dir) => acquisition.extractor().extract_into(archive, dir).await,
            None => acquisition.extractor().extract(archive).await,
        }
    };
    drop(sink);
    let _ = renderer.await;

    let outcome = result?;
    println!("Extracted to {}", outcome.extracted_directory.display());
    println!("  Strategy: {}", outcome.strategy_used);
    for failure in outcome.diagnostic_trail.entries() {
        println!("  [{}] {}", failure.strategy, failure.message);
    }
    Ok(())
}
