//! Stage error taxonomy.
//!
//! Mirrors spec.md §7: a stage never panics across its own boundary. On
//! failure it returns a [`StageError`], which the driver records against the
//! chain's state and moves on to the next stage. `InvariantViolation` is the
//! one variant the driver treats as fatal for the whole chain.

use std::path::PathBuf;
use thiserror::Error;

/// Error produced by a single pipeline stage.
///
/// `EmptyResult` (spec.md §7) deliberately has no variant here — zero hits or
/// zero domains is a valid `Ok` outcome, not an error.
#[derive(Debug, Error)]
pub enum StageError {
    /// A required input file does not exist.
    #[error("missing input file for stage {stage}: {path}")]
    InputMissing { stage: &'static str, path: PathBuf },

    /// A tool-output file exists but could not be parsed.
    #[error("failed to parse {stage} output ({detail})")]
    ParseError { stage: &'static str, detail: String },

    /// An external tool exited with a non-zero status.
    ///
    /// This crate never invokes external tools itself (spec.md §1 out of
    /// scope); this variant exists for a caller that wraps tool invocation
    /// and wants to report the failure through the same taxonomy.
    #[error("tool {tool} failed with status {status}")]
    ToolFailure { tool: &'static str, status: i32 },

    /// A structural invariant was violated (residue out of range, negative
    /// length, non-monotonic range). Fatal: the driver aborts the chain.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl StageError {
    /// True for the one variant that should abort the whole chain rather
    /// than simply being recorded and skipped (spec.md §7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::InvariantViolation(_))
    }
}

/// Result alias used throughout `stages/`.
pub type StageResult<T> = Result<T, StageError>;
