//! File preparation run before posting: splitting and recovery files.

pub mod recovery;
pub mod split;

pub use recovery::{RecoveryRequest, RecoverySetGenerator, parse_percent};
pub use split::{FileSplitter, chunk_path, split_file, suffix_width};
