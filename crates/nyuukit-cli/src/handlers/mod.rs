//! Command handlers.
//!
//! Handlers follow one pattern: `pub async fn execute(ctx, ...) -> Result<()>`.
//! They parse CLI-specific input, call into `nyuukit-runtime`, and format the
//! result for the terminal. Pipeline logic stays in the runtime crate.

pub mod config;
pub mod context;
pub mod extract;
pub mod par2;
pub mod post;
pub mod setup;
pub mod split;
pub mod tools;

use tokio_util::sync::CancellationToken;
use tracing::info;

pub use context::CliContext;

/// Cancel `token` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}
