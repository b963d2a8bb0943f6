//! Command-line adapter for nyuukit.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

use dotenvy as _;
use tracing_subscriber as _;

pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod progress;

pub use commands::{Commands, ConfigCommand, HelperArg, ToolArg, ToolsCommand};
pub use error::CliError;
pub use parser::Cli;
