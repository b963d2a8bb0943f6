//! CLI entry point.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use nyuukit_cli::handlers::par2::Par2Args;
use nyuukit_cli::handlers::{self, CliContext};
use nyuukit_cli::{Cli, CliError, Commands, ToolsCommand};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let err = CliError::classify(&err);
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut ctx = CliContext::load(cli.config)?;

    match command {
        Commands::Setup { platform, force } => {
            handlers::setup::execute(&mut ctx, platform, force).await?;
        }
        Commands::Tools { command } => match command {
            ToolsCommand::Locate { tool } => handlers::tools::locate(&ctx, tool.into()).await?,
            ToolsCommand::Provision { tool } => {
                handlers::tools::provision(&ctx, tool.into()).await?;
            }
        },
        Commands::Extract { archive, out } => {
            handlers::extract::execute(&ctx, &archive, out.as_deref()).await?;
        }
        Commands::Split { file, size, out } => {
            handlers::split::execute(&file, &size, out.as_deref()).await?;
        }
        Commands::Par2 {
            files,
            redundancy,
            out,
            name,
        } => {
            let args = Par2Args {
                files,
                redundancy,
                out,
                name,
            };
            handlers::par2::execute(&ctx, args).await?;
        }
        Commands::Post { files, dry_run } => {
            handlers::post::execute(&ctx, files, dry_run).await?;
        }
        Commands::Config { command } => handlers::config::execute(&ctx, &command)?,
    }

    Ok(())
}
