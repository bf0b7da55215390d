//! Reference-data loader (spec.md §4.D).
//!
//! Acquisition of the underlying files (ECOD hierarchy dump, template
//! library, classifier checkpoint) is out of scope (spec.md §1) — this
//! module only parses and indexes them once they're on disk. Eager tables
//! ([`hierarchy`], [`lengths`]) are loaded up front; per-template
//! [`weights`] and [`history`] are lazy and cached, matching spec.md §4.D's
//! eager/lazy split.

pub mod checkpoint;
pub mod hierarchy;
pub mod history;
pub mod lengths;
pub mod weights;

pub use checkpoint::CheckpointFile;
pub use hierarchy::{EcodHierarchy, HierarchyRow};
pub use history::TemplateHistories;
pub use lengths::TemplateLengths;
pub use weights::TemplateWeights;

use std::path::{Path, PathBuf};

use crate::error::StageError;

/// Bundle of all reference data a chain's driver needs, loaded once per
/// batch and shared read-only across chains (spec.md §5 "Shared-resource
/// policy").
pub struct ReferenceData {
    pub hierarchy: EcodHierarchy,
    pub lengths: TemplateLengths,
    pub weights: TemplateWeights,
    pub histories: TemplateHistories,
    pub checkpoint: CheckpointFile,
}

impl ReferenceData {
    /// Load the eager tables (`hierarchy.tsv`, `lengths.tsv`) and the
    /// classifier checkpoint from `dir`; wire up lazy per-template caches
    /// rooted at `dir/weights` and `dir/history`.
    pub fn load(dir: &Path) -> Result<Self, StageError> {
        let hierarchy_path = dir.join("hierarchy.tsv");
        let hierarchy_text =
            std::fs::read_to_string(&hierarchy_path).map_err(|_| StageError::InputMissing {
                stage: "refdata",
                path: hierarchy_path.clone(),
            })?;
        let hierarchy = EcodHierarchy::parse(std::io::Cursor::new(hierarchy_text))?;

        let lengths_path = dir.join("lengths.tsv");
        let lengths_text =
            std::fs::read_to_string(&lengths_path).map_err(|_| StageError::InputMissing {
                stage: "refdata",
                path: lengths_path.clone(),
            })?;
        let lengths = TemplateLengths::parse(std::io::Cursor::new(lengths_text))?;

        let checkpoint_path = dir.join("classifier_checkpoint.json");
        let checkpoint = CheckpointFile::load(&checkpoint_path)?;

        Ok(Self {
            hierarchy,
            lengths,
            weights: TemplateWeights::new(dir.join("weights")),
            histories: TemplateHistories::new(dir.join("history")),
            checkpoint,
        })
    }
}

/// The h-group key for a t-group string, per spec.md §3: "prefix (first two
/// dotted components)". `"2002.1.1"` -> `"2002.1"`; `"2002.1"` -> `"2002.1"`
/// (already two components); a bare single-component t-group has no parent
/// and is returned unchanged.
pub fn h_group_of(t_group: &str) -> String {
    let parts: Vec<&str> = t_group.split('.').collect();
    if parts.len() <= 2 {
        t_group.to_string()
    } else {
        format!("{}.{}", parts[0], parts[1])
    }
}

pub fn weights_dir(base: &Path) -> PathBuf {
    base.join("weights")
}
