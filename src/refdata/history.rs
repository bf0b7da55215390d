//! Per-template historical z-score and q-score distributions (spec.md §4.D,
//! §4.H stage 8). Lazily loaded and cached like [`super::weights`]; absent
//! history yields a percentile of `-1`, per spec.md §4.H.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use statrs::distribution::{ContinuousCDF, Empirical};

/// One template's historical score lists.
#[derive(Debug, Clone, Default)]
pub struct TemplateHistory {
    pub z_scores: Vec<f64>,
    pub q_scores: Vec<f64>,
}

/// Lazily-populated cache of per-template historical score distributions.
///
/// Reads from `{dir}/{template_uid}.zhist` and `{dir}/{template_uid}.qhist`,
/// one score per line.
#[derive(Debug)]
pub struct TemplateHistories {
    dir: PathBuf,
    cache: RwLock<HashMap<String, TemplateHistory>>,
}

impl TemplateHistories {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_load(&self, template_uid: &str) -> TemplateHistory {
        if let Some(cached) = self
            .cache
            .read()
            .expect("history cache poisoned")
            .get(template_uid)
        {
            return cached.clone();
        }
        let loaded = TemplateHistory {
            z_scores: read_score_file(&self.dir, template_uid, "zhist"),
            q_scores: read_score_file(&self.dir, template_uid, "qhist"),
        };
        self.cache
            .write()
            .expect("history cache poisoned")
            .insert(template_uid.to_string(), loaded.clone());
        loaded
    }

    /// `z_tile` for an observed z-score (spec.md §4.H stage 8): fraction of
    /// historical z-scores strictly greater than `observed_z`, or `-1` if no
    /// history is available for this template.
    pub fn z_tile(&self, template_uid: &str, observed_z: f64) -> f64 {
        percentile_above(&self.get_or_load(template_uid).z_scores, observed_z)
    }

    /// `q_tile`, analogous to [`Self::z_tile`] but over q-scores.
    pub fn q_tile(&self, template_uid: &str, observed_q: f64) -> f64 {
        percentile_above(&self.get_or_load(template_uid).q_scores, observed_q)
    }
}

fn read_score_file(dir: &Path, template_uid: &str, ext: &str) -> Vec<f64> {
    let path = dir.join(format!("{template_uid}.{ext}"));
    std::fs::read_to_string(path)
        .map(|text| {
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .filter_map(|l| l.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Fraction of `history` strictly greater than `observed`, via statrs's
/// empirical-distribution CDF. `-1` if `history` is empty (spec.md §4.H).
fn percentile_above(history: &[f64], observed: f64) -> f64 {
    if history.is_empty() {
        return -1.0;
    }
    let empirical = Empirical::from_slice(history);
    // cdf(x) ~= fraction of history <= x; the fraction strictly greater is
    // its complement.
    1.0 - empirical.cdf(observed)
}
