//! `par2`: create recovery files for a set of inputs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use nyuukit_runtime::{RecoveryRequest, RecoverySetGenerator};
use tokio_util::sync::CancellationToken;

use super::cancel_on_ctrl_c;
use super::context::{CliContext, progress_channel};

pub struct Par2Args {
    pub files: Vec<PathBuf>,
    pub redundancy: Option<u8>,
    pub out: Option<PathBuf>,
    pub name: Option<String>,
}

pub async fn execute(ctx: &CliContext, args: Par2Args) -> Result<()> {
    let redundancy = args
        .redundancy
        .unwrap_or(ctx.settings.preparation.par2_redundancy);
    let mut request = RecoveryRequest::new(args.files, redundancy);
    if let Some(dir) = args.out {
        request = request.output_dir(dir);
    }
    if let Some(name) = args.name {
        request = request.basename(name);
    }

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());

    let (sink, renderer) = progress_channel();
    let result = {
        let acquisition = Arc::new(ctx.acquisition(Arc::clone(&sink))?);
        RecoverySetGenerator::new(acquisition)
            .with_sink(Arc::clone(&sink))
            .generate(&request, Some(&token))
            .await
    };
    drop(sink);
    let _ = renderer.await;

    let set = result?;
    for file in &set.recovery_files {
        println!("{}", file.display());
    }
    Ok(())
}
