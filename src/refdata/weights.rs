//! Per-template position-weight vectors (spec.md §4.D), lazily loaded and
//! cached. Default is a uniform weight of `1.0` per template position when no
//! weight file exists for a template.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Lazily-populated cache of per-template position weights.
///
/// Reads happen from `{dir}/{template_uid}.weights`, one float per line
/// (one entry per template position, 1-indexed). Missing files are not an
/// error — they fall back to a uniform weight vector of the requested
/// length.
#[derive(Debug)]
pub struct TemplateWeights {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Vec<f64>>>,
}

impl TemplateWeights {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Weight vector for `template_uid`, one entry per template position
    /// (1-indexed: index 0 is template position 1). `template_length` is
    /// used only to build the uniform fallback when no file is present.
    pub fn get(&self, template_uid: &str, template_length: usize) -> Vec<f64> {
        if let Some(cached) = self.cache.read().expect("weights cache poisoned").get(template_uid) {
            return cached.clone();
        }
        let loaded = Self::load_from_disk(&self.dir, template_uid)
            .unwrap_or_else(|| vec![1.0; template_length]);
        self.cache
            .write()
            .expect("weights cache poisoned")
            .insert(template_uid.to_string(), loaded.clone());
        loaded
    }

    /// Whether a weights file exists on disk for `template_uid`, without
    /// populating the uniform-fallback cache entry (spec.md §4.H stage 8:
    /// `q_score` is `-1` when "weights absent", which the uniform fallback
    /// in [`Self::get`] would otherwise mask).
    pub fn has_file(&self, template_uid: &str) -> bool {
        self.dir.join(format!("{template_uid}.weights")).exists()
    }

    fn load_from_disk(dir: &Path, template_uid: &str) -> Option<Vec<f64>> {
        let path = dir.join(format!("{template_uid}.weights"));
        let text = std::fs::read_to_string(path).ok()?;
        let values: Vec<f64> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| l.trim().parse().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// Weight at a specific 1-based template position, `1.0` if out of
    /// bounds (defensive default, not expected to be exercised when the
    /// vector length matches the template).
    pub fn weight_at(weights: &[f64], template_pos: usize) -> f64 {
        weights.get(template_pos.saturating_sub(1)).copied().unwrap_or(1.0)
    }
}
