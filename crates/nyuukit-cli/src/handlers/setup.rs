//! `setup`: download Nyuu and remember where it is.

use std::str::FromStr;

use anyhow::{Result, anyhow};
use nyuukit_core::PlatformSelector;

use super::context::{CliContext, progress_channel};

pub async fn execute(ctx: &mut CliContext, platform: Option<String>, force: bool) -> Result<()> {
    let selector = match platform {
        Some(label) => PlatformSelector::from_str(&label)?,
        None => PlatformSelector::detect().ok_or_else(|| {
            let labels: Vec<_> = PlatformSelector::ALL.iter().map(|s| s.label()).collect();
            anyhow!(
                "No Nyuu build for this machine; pass --platform with one of: {}",
                labels.join(", ")
            )
        })?,
    };

    let (sink, renderer) = progress_channel();
    let result = {
        let acquisition = ctx.acquisition(sink)?;
        acquisition.acquire_poster(selector, force).await
    };
    let _ = renderer.await;
    let handle = result?;

    println!("Nyuu for {selector}: {}", handle.executable_path.display());
    println!("  Source: {}", handle.origin);

    if PlatformSelector::detect() == Some(selector) {
        ctx.settings.nyuu_path = Some(handle.executable_path);
        ctx.save()?;
        println!("  Saved to {}", ctx.config_path.display());
    } else {
        println!("  Not saved: this build is for a different platform.");
    }
    Ok(())
}
