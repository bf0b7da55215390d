//! Operator-tunable pipeline configuration.
//!
//! Everything spec.md marks as a *fixed* constant (probability tables,
//! thresholds like `0.54`/`0.60`/`25`) lives in [`super::defaults`], not
//! here. This struct only holds the handful of knobs the spec explicitly
//! allows an operator to set: reference-data location, the stage 7 worker
//! pool size, and resume behavior.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-batch pipeline configuration, loaded once and shared read-only
/// across chains (spec.md §5 "Shared-resource policy").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding ECOD hierarchy, template lengths, per-template
    /// weights/history, and the classifier checkpoint (spec.md §4.D, §6).
    pub reference_data_dir: PathBuf,

    /// Base directory for per-chain working files and stage output.
    pub work_dir: PathBuf,

    /// Stage 7 worker pool size (`W` in spec.md §5). Bounded by available
    /// cores at call sites; this is the configured ceiling.
    #[serde(default = "super::defaults::default_stage7_workers")]
    pub stage7_workers: usize,

    /// Whether a fresh invocation should skip stages already marked
    /// `completed` with existing output files (spec.md §4.E).
    #[serde(default)]
    pub resume: bool,
}

impl PipelineConfig {
    /// Load from a TOML file.
    pub fn load_from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        let config: PipelineConfig = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        Ok(config)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_data_dir: PathBuf::from("refdata"),
            work_dir: PathBuf::from("work"),
            stage7_workers: super::defaults::DEFAULT_STAGE7_WORKERS,
            resume: true,
        }
    }
}
