//! `tools locate` and `tools provision`.

use anyhow::{Result, bail};
use nyuukit_core::ToolKind;
use nyuukit_runtime::install_instructions;

use super::context::{CliContext, progress_channel};

pub async fn locate(ctx: &CliContext, tool: ToolKind) -> Result<()> {
    if tool == ToolKind::Poster {
        if let Some(path) = ctx.settings.nyuu_path.as_ref().filter(|p| p.is_file()) {
            println!("{tool}: {} (configured)", path.display());
            return Ok(());
        }
    }

    let acquisition = ctx.acquisition(std::sync::Arc::new(nyuukit_core::NoopSink))?;
    match acquisition.locator().locate(tool).await {
        Some(handle) => {
            println!("{tool}: {} ({})", handle.executable_path.display(), handle.origin);
            Ok(())
        }
        None => {
            println!("{tool} was not found.\n");
            println!("{}", install_instructions(tool));
            bail!("{tool} is not available")
        }
    }
}

pub async fn provision(ctx: &CliContext, tool: ToolKind) -> Result<()> {
    let (sink, renderer) = progress_channel();
    let result = {
        let acquisition = ctx.acquisition(sink.clone())?;
        if acquisition.provisioner().supports(tool) {
            acquisition
                .provisioner()
                .provision(tool, sink.as_ref())
                .await
                .map_err(anyhow::Error::from)
        } else {
            Err(anyhow::anyhow!(
                "No standalone {tool} build is known for this platform.\n\n{}",
                install_instructions(tool)
            ))
        }
    };
    drop(sink);
    let _ = renderer.await;

    let handle = result?;
    println!("{tool}: {}", handle.executable_path.display());
    Ok(())
}
