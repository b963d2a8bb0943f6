//! `split`: cut one file into numbered chunks.

use std::path::Path;

use anyhow::{Context, Result};
use nyuukit_core::parse_size;
use nyuukit_runtime::FileSplitter;

use super::context::progress_channel;

pub async fn execute(file: &Path, size: &str, out: Option<&Path>) -> Result<()> {
    let chunk_size = parse_size(size).with_context(|| format!("Invalid --size '{size}'"))?;

    let (sink, renderer) = progress_channel();
    let result = FileSplitter::new(sink).split(file, chunk_size, out).await;
    let _ = renderer.await;

    let plan = result?;
    if plan.is_identity() {
        println!("{} is not larger than {size}; nothing to split.", file.display());
    } else {
        for chunk in &plan.chunk_paths {
            println!("{}", chunk.display());
        }
    }
    Ok(())
}
