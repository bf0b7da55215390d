//! Shared intermediate record types threaded between stages (spec.md §6's
//! per-stage intermediate file schemas, kept here as structured in-memory
//! records rather than re-parsed from disk at every stage boundary — each
//! stage still *writes* its textual artifact via [`super::write_stage_file`]
//! for the external interface spec.md §6 describes, but downstream stages
//! consume the typed value the driver already has in hand).

use crate::hits::TemplateId;
use crate::resid::{ResId, ResSet};

/// `"na"` for an absent channel's range, its canonical range string
/// otherwise — the convention every per-channel range column in this
/// module's output rows uses.
fn fmt_optional_range(r: &Option<ResSet>) -> String {
    r.as_ref().map(ResSet::format).unwrap_or_else(|| "na".to_string())
}

/// Which evidence channel a [`GoodHit`] (spec.md §4.H/§4.K) originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceSource {
    Sequence,
    Structural,
}

impl EvidenceSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceSource::Sequence => "sequence",
            EvidenceSource::Structural => "structure",
        }
    }
}

/// A scored, percentiled, ECOD-annotated hit (spec.md §4.H stage 8 /
/// §4.H stage 10 unified `goodDomains` row). One value type serves stage
/// 8's `*_good_hits` output, stage 9's `*_sequence.result` /
/// `*_structure.result` split, and stage 10's unified `*.goodDomains` table
/// — they differ only in which subset of rows survives to each file.
#[derive(Debug, Clone)]
pub struct GoodHit {
    pub source: EvidenceSource,
    pub template_uid: TemplateId,
    pub short_id: String,
    pub t_group: String,
    pub h_group: String,
    /// Sequence probability (0..=100) or structural z-score, depending on
    /// `source`.
    pub score: f64,
    pub coverage: f64,
    pub template_length: usize,
    /// Stage 8 `q_score`; `-1` if position weights were unavailable.
    pub q_score: f64,
    /// Stage 8 `z_tile`; `-1` if no historical z-score distribution.
    pub z_tile: f64,
    /// Stage 8 `q_tile`; `-1` if no historical q-score distribution.
    pub q_tile: f64,
    /// Stage 8 `rank`: mean `|pos -> set(h_group)|` over the hit's query
    /// positions, evaluated against all hits seen so far in descending-z
    /// order.
    pub rank: f64,
    pub query_range: ResSet,
    pub template_range: ResSet,
    /// Parallel, alignment-order residue lists (lost by `ResSet`, needed
    /// for per-position mapping in stages 9/15/18).
    pub query_resids: Vec<ResId>,
    pub template_resids: Vec<ResId>,
}

impl GoodHit {
    /// Tab-separated row matching spec.md §6 stage 8's 11-column schema:
    /// `hitname, ecodnum, ecodkey, hgroup, zscore, qscore, ztile, qtile, rank, qrange, erange`.
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}\t{}",
            self.template_uid,
            self.template_uid,
            self.short_id,
            self.h_group,
            self.score,
            self.q_score,
            self.z_tile,
            self.q_tile,
            self.rank,
            self.query_range.format(),
            self.template_range.format(),
        )
    }

    /// Stage 10 `*.goodDomains` row: `type, query_id, template_uid,
    /// short_id, t_group, score, coverage, template_length, template_range,
    /// query_range`.
    pub fn to_good_domains_row(&self, query_id: &str) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.3}\t{}\t{}\t{}",
            self.source.as_str(),
            query_id,
            self.template_uid,
            self.short_id,
            self.t_group,
            self.score,
            self.coverage,
            self.template_length,
            self.template_range.format(),
            self.query_range.format(),
        )
    }
}

/// Stage 15 feature row: one per (domain, template) pair clearing the
/// permissive-overlap gate. Holds the 13 numerical features plus the
/// identifying/metadata columns spec.md §6 lists alongside them.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub domain_id: String,
    pub domain_range: String,
    pub t_group: String,
    pub h_group: String,
    pub template_id: TemplateId,
    pub short_id: String,
    // --- 13 numerical features, in the order the classifier expects ---
    pub domain_length: f64,
    pub helix_count: f64,
    pub strand_count: f64,
    pub hh_prob: f64,
    pub hh_cov: f64,
    pub hh_rank: f64,
    pub d_z: f64,
    pub d_q: f64,
    pub d_ztile: f64,
    pub d_qtile: f64,
    pub d_rank: f64,
    pub c_diff: f64,
    pub c_cov: f64,
    // --- trailing metadata columns (spec.md §6: 23 columns total), the
    // best sequence/structural hit's own aligned ranges for this
    // (domain, template) pair, `None` when that channel is absent ---
    pub hh_query_range: Option<ResSet>,
    pub hh_template_range: Option<ResSet>,
    pub dali_query_range: Option<ResSet>,
    pub dali_template_range: Option<ResSet>,
}

impl FeatureRow {
    /// The 13 features in classifier input order (spec.md §4.K).
    pub fn as_array(&self) -> [f32; crate::classifier::NUM_FEATURES] {
        [
            self.domain_length as f32,
            self.helix_count as f32,
            self.strand_count as f32,
            self.hh_prob as f32,
            self.hh_cov as f32,
            self.hh_rank as f32,
            self.d_z as f32,
            self.d_q as f32,
            self.d_ztile as f32,
            self.d_qtile as f32,
            self.d_rank as f32,
            self.c_diff as f32,
            self.c_cov as f32,
        ]
    }

    /// Tab-separated row matching spec.md §6's 23-column `P.step15_features`
    /// schema: the 6 identifying columns, the 13 classifier features in
    /// [`Self::as_array`] order, and the 4 trailing per-channel range
    /// columns, `na` where that channel is absent for this template.
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.0}\t{:.0}\t{:.0}\t{:.2}\t{:.3}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.3}\t{}\t{}\t{}\t{}",
            self.domain_id,
            self.domain_range,
            self.t_group,
            self.h_group,
            self.template_id,
            self.short_id,
            self.domain_length,
            self.helix_count,
            self.strand_count,
            self.hh_prob,
            self.hh_cov,
            self.hh_rank,
            self.d_z,
            self.d_q,
            self.d_ztile,
            self.d_qtile,
            self.d_rank,
            self.c_diff,
            self.c_cov,
            fmt_optional_range(&self.hh_query_range),
            fmt_optional_range(&self.hh_template_range),
            fmt_optional_range(&self.dali_query_range),
            fmt_optional_range(&self.dali_template_range),
        )
    }
}

/// Stage 16 output: a feature row plus the classifier's probability.
#[derive(Debug, Clone)]
pub struct PredictionRow {
    pub features: FeatureRow,
    pub classifier_prob: f64,
}

/// Stage 17 survivor: best prediction per surviving t-group, with its
/// quality label.
#[derive(Debug, Clone)]
pub struct ConfidentPrediction {
    pub domain_id: String,
    pub domain_range: String,
    pub template_id: TemplateId,
    pub t_group: String,
    pub h_group: String,
    pub short_id: String,
    pub classifier_prob: f64,
    pub quality: crate::domain::Quality,
    pub hh_prob: f64,
    pub hh_cov: f64,
}

/// Stage 18 output row: query/template ranges restricted to the domain,
/// separately for whichever channel(s) produced the underlying hit.
#[derive(Debug, Clone)]
pub struct MappingRow {
    pub domain_id: String,
    pub template_id: TemplateId,
    pub hh_query_range: Option<ResSet>,
    pub hh_template_range: Option<ResSet>,
    pub dali_query_range: Option<ResSet>,
    pub dali_template_range: Option<ResSet>,
}

impl MappingRow {
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.domain_id,
            self.template_id,
            fmt_optional_range(&self.hh_query_range),
            fmt_optional_range(&self.hh_template_range),
            fmt_optional_range(&self.dali_query_range),
            fmt_optional_range(&self.dali_template_range),
        )
    }
}

/// Stage 21 output row: a proposed merge pair plus its connectivity
/// judgment.
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub domain_a: String,
    pub domain_b: String,
    pub judgment: crate::merge::Judgment,
}

/// Stage 22 output: one merged entity per connected component.
#[derive(Debug, Clone)]
pub struct MergedDomain {
    pub id: String,
    pub resids: ResSet,
    pub source_domains: Vec<String>,
}

/// Stage 23 output row: the single best (domain, template) candidate, with
/// its coverage-based classification (`full`/`part`/`miss`), ahead of stage
/// 24's SSE-aware relabeling.
#[derive(Debug, Clone)]
pub struct Stage23Prediction {
    pub domain_id: String,
    pub range: String,
    pub resids: ResSet,
    pub template_id: TemplateId,
    pub t_group: String,
    pub h_group: String,
    pub short_ecod_key: String,
    pub classifier_prob: f64,
    pub quality: crate::domain::Quality,
    pub classification: crate::domain::Classification,
    pub weighted_coverage: f64,
    pub length_coverage: f64,
    pub hh_prob: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_row() -> FeatureRow {
        FeatureRow {
            domain_id: "D1".into(),
            domain_range: "1-50".into(),
            t_group: "1.1".into(),
            h_group: "1".into(),
            template_id: "t1".into(),
            short_id: "t1".into(),
            domain_length: 50.0,
            helix_count: 2.0,
            strand_count: 1.0,
            hh_prob: 90.0,
            hh_cov: 0.8,
            hh_rank: 0.1,
            d_z: 1.2,
            d_q: 0.5,
            d_ztile: 0.2,
            d_qtile: 0.2,
            d_rank: 0.3,
            c_diff: 1.0,
            c_cov: 0.9,
            hh_query_range: Some(ResSet::parse("1-10").unwrap()),
            hh_template_range: None,
            dali_query_range: None,
            dali_template_range: None,
        }
    }

    #[test]
    fn feature_row_emits_23_columns() {
        let row = feature_row();
        assert_eq!(row.to_row().split('\t').count(), 23);
    }

    #[test]
    fn feature_row_renders_absent_channel_ranges_as_na() {
        let row = feature_row();
        let cols: Vec<&str> = row.to_row().split('\t').collect();
        assert_eq!(cols[3], "1"); // h_group
        assert_eq!(cols[19], "1-10"); // hh_query_range
        assert_eq!(cols[20], "na"); // hh_template_range
        assert_eq!(cols[21], "na"); // dali_query_range
        assert_eq!(cols[22], "na"); // dali_template_range
    }
}
