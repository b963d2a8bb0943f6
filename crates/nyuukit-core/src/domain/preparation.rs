use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const MIN_REDUNDANCY_PERCENT: u8 = 1;
pub const MAX_REDUNDANCY_PERCENT: u8 = 100;

/// Ordered chunk files produced from one source file.
///
/// An empty `chunk_paths` means the identity plan: the source was already
/// within the chunk size and is used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub source_file: PathBuf,
    pub chunk_size_bytes: u64,
    pub chunk_paths: Vec<PathBuf>,
}

impl SplitPlan {
    pub const fn identity(source_file: PathBuf, chunk_size_bytes: u64) -> Self {
        Self {
            source_file,
            chunk_size_bytes,
            chunk_paths: Vec::new(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.chunk_paths.is_empty()
    }

    /// Files that should stand in for the source in later stages.
    pub fn output_files(&self) -> Vec<PathBuf> {
        if self.is_identity() {
            vec![self.source_file.clone()]
        } else {
            self.chunk_paths.clone()
        }
    }
}

/// Recovery files generated over a set of inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySet {
    pub input_files: Vec<PathBuf>,
    pub redundancy_percent: u8,
    pub recovery_files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_plan_yields_source() {
        let plan = SplitPlan::identity(PathBuf::from("/data/a.mkv"), 100);
        assert!(plan.is_identity());
        assert_eq!(plan.output_files(), vec![PathBuf::from("/data/a.mkv")]);
    }

    #[test]
    fn chunked_plan_yields_chunks() {
        let plan = SplitPlan {
            source_file: PathBuf::from("a.bin"),
            chunk_size_bytes: 10,
            chunk_paths: vec![PathBuf::from("a.bin.001"), PathBuf::from("a.bin.002")],
        };
        assert_eq!(plan.output_files().len(), 2);
    }
}
