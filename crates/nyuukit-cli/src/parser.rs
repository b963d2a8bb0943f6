//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Prepare files and post them to Usenet with Nyuu.
#[derive(Parser)]
#[command(name = "nyuukit")]
#[command(about = "Acquire Nyuu and its helpers, prepare files, and post them to Usenet")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long = "config", global = true, env = "NYUUKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ToolArg, ToolsCommand};
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["nyuukit", "--verbose", "--config", "/tmp/c.json", "config", "show"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
    }

    #[test]
    fn test_tool_names() {
        let cli = Cli::parse_from(["nyuukit", "tools", "locate", "7z"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Tools {
                command: ToolsCommand::Locate { tool: ToolArg::SevenZip }
            })
        ));
        assert!(Cli::try_parse_from(["nyuukit", "tools", "provision", "nyuu"]).is_err());
    }

    #[test]
    fn test_post_dry_run() {
        let cli = Cli::parse_from(["nyuukit", "post", "--dry-run", "a.mkv", "b.mkv"]);
        let Some(Commands::Post { files, dry_run }) = cli.command else {
            panic!("expected post");
        };
        assert!(dry_run);
        assert_eq!(files, vec![PathBuf::from("a.mkv"), PathBuf::from("b.mkv")]);
    }
}
