//! Child process execution with merged output streaming.
//!
//! # Structure
//!
//! - `CommandSpec` - program, arguments and working directory
//! - `ProcessRunner` - spawns a `CommandSpec` into a `RunningProcess`
//! - `RunningProcess` - owned handle: line stream, wait, terminate
//! - `shutdown` - SIGTERM with escalation to SIGKILL

mod runner;
pub mod shutdown;
mod stream;

pub use runner::{CommandSpec, ProcessRunner, RunningProcess};
