//! Graceful child process shutdown.

mod child;

pub use child::{send_terminate, shutdown_child};
