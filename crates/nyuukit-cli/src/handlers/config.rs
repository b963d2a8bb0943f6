//! `config show` and `config init`.

use anyhow::{Result, bail};
use nyuukit_core::{PosterSettings, validate_settings};
use nyuukit_runtime::poster::PASSWORD_MASK;

use super::context::CliContext;
use crate::commands::ConfigCommand;

pub fn execute(ctx: &CliContext, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init { force } => init(ctx, *force),
    }
}

fn show(ctx: &CliContext) -> Result<()> {
    let mut settings = ctx.settings.clone();
    if !settings.server.password.is_empty() {
        settings.server.password = PASSWORD_MASK.to_string();
    }
    println!("# {}", ctx.config_path.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);

    if let Err(e) = validate_settings(&ctx.settings) {
        eprintln!("\nWarning: {e}");
    }
    Ok(())
}

fn init(ctx: &CliContext, force: bool) -> Result<()> {
    if ctx.config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            ctx.config_path.display()
        );
    }
    PosterSettings::default().save(&ctx.config_path)?;
    println!("Wrote default configuration to {}", ctx.config_path.display());
    Ok(())
}
