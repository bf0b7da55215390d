//! The 24 (23 distinct, no stage 14) per-chain pipeline stages (spec.md
//! §4.F-§4.P). Each `stageNN_*` module exposes a `run` function taking the
//! accumulated [`crate::pipeline::ChainContext`] and returning
//! [`crate::error::StageResult<()>`], mutating the context with this
//! stage's output and writing the textual artifact spec.md §6 names for it.

pub mod records;

pub mod stage01_prepare;
pub mod stage02_hhsearch;
pub mod stage03_foldseek;
pub mod stage04_filter_foldseek;
pub mod stage05_map_ecod;
pub mod stage06_dali_candidates;
pub mod stage07_iterative_alignment;
pub mod stage08_good_hits;
pub mod stage09_get_support;
pub mod stage10_filter_domains;
pub mod stage11_sse;
pub mod stage12_disorder;
pub mod stage13_partition;
pub mod stage15_features;
pub mod stage16_classifier;
pub mod stage17_confidence_filter;
pub mod stage18_alignment_mapping;
pub mod stage19_merge_candidates;
pub mod stage20_extract_domains;
pub mod stage21_compare_domains;
pub mod stage22_merge_domains;
pub mod stage23_classify_coverage;
pub mod stage24_final_labels;

use std::path::Path;

use crate::error::StageError;

/// Write one stage's textual artifact to `work_dir/filename`, per spec.md
/// §6. Stages that legitimately produce zero rows still write a (possibly
/// empty) file — spec.md §7 `EmptyResult`: "downstream stages emit
/// header-only files and continue".
pub(crate) fn write_stage_file(work_dir: &Path, filename: &str, content: &str) -> Result<(), StageError> {
    std::fs::create_dir_all(work_dir).map_err(|_| StageError::InputMissing {
        stage: "stage_output",
        path: work_dir.to_path_buf(),
    })?;
    let path = work_dir.join(filename);
    std::fs::write(&path, content).map_err(|_| StageError::InputMissing {
        stage: "stage_output",
        path,
    })
}

/// Join row strings with trailing newlines, the convention every stage's
/// tab-separated output file uses.
pub(crate) fn join_rows<I: IntoIterator<Item = String>>(rows: I) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row);
        out.push('\n');
    }
    out
}
