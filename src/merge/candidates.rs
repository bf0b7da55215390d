//! Merge candidate proposal (spec.md §4.O stage 19 `CANDIDATES`).
//!
//! Consumes the confident (domain, template) predictions stage 17/18
//! produced and proposes domain pairs that might be the same underlying
//! domain, based on shared-template evidence.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::defaults::{
    CLASSIFY_LCOV_FLOOR, CLASSIFY_PROB_FLOOR, MERGE_CANDIDATE_MAX_OVERLAP,
    MERGE_CANDIDATE_PROB_DELTA,
};
use crate::hits::TemplateId;
use crate::resid::ResSet;

/// One confident (domain, template) prediction, carrying the fields stage
/// 19 needs: the classifier probability (for the "within 0.1 of best"
/// filter), the template range mapped back in stage 18 (for the overlap
/// test), and the coverage ratios (for the "opposing template" test).
#[derive(Debug, Clone)]
pub struct DomainPrediction {
    pub domain_id: String,
    pub template_id: TemplateId,
    pub probability: f64,
    pub template_range: ResSet,
    pub length_coverage: f64,
}

/// A proposed merge between two domains, with the templates whose evidence
/// supported it.
#[derive(Debug, Clone)]
pub struct MergeCandidate {
    pub domain_a: String,
    pub domain_b: String,
    pub shared_templates: Vec<TemplateId>,
}

/// `true` if the two template ranges overlap by less than
/// [`MERGE_CANDIDATE_MAX_OVERLAP`] on *each* side (spec.md §4.O: "each
/// side"). Disjoint ranges trivially pass.
fn co_fits(a: &ResSet, b: &ResSet) -> bool {
    if a.is_empty() || b.is_empty() {
        return true;
    }
    let shared = a.intersect(b).size() as f64;
    let frac_a = shared / a.size() as f64;
    let frac_b = shared / b.size() as f64;
    frac_a < MERGE_CANDIDATE_MAX_OVERLAP && frac_b < MERGE_CANDIDATE_MAX_OVERLAP
}

/// `true` if this prediction counts as a "high-confidence, high-coverage"
/// hit for the opposing-template count (spec.md §4.O). The spec names the
/// concept without pinning numbers; this reuses stage 23's `full`/`part`
/// classification floors (`classifier_prob >= 0.85`, `length_cov >= 0.33`)
/// as the natural definition of "high confidence, high coverage" already
/// established elsewhere in the pipeline, recorded as a design decision in
/// DESIGN.md.
fn is_high_confidence_high_coverage(p: &DomainPrediction) -> bool {
    p.probability >= CLASSIFY_PROB_FLOOR && p.length_coverage >= CLASSIFY_LCOV_FLOOR
}

/// Propose merge candidates from a batch of confident predictions across
/// all domains of one chain.
pub fn propose_candidates(predictions: &[DomainPrediction]) -> Vec<MergeCandidate> {
    // Step 1: per domain, keep only predictions within MERGE_CANDIDATE_PROB_DELTA
    // of that domain's best probability ("top predictions").
    let mut by_domain: BTreeMap<&str, Vec<&DomainPrediction>> = BTreeMap::new();
    for p in predictions {
        by_domain.entry(&p.domain_id).or_default().push(p);
    }
    let mut top: BTreeMap<&str, Vec<&DomainPrediction>> = BTreeMap::new();
    for (domain, preds) in &by_domain {
        let best = preds.iter().map(|p| p.probability).fold(f64::MIN, f64::max);
        let mut kept: Vec<&DomainPrediction> = preds
            .iter()
            .copied()
            .filter(|p| p.probability >= best - MERGE_CANDIDATE_PROB_DELTA)
            .collect();
        kept.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        top.insert(domain, kept);
    }

    // Step 2: index top predictions by template.
    let mut by_template: BTreeMap<&str, BTreeMap<&str, &DomainPrediction>> = BTreeMap::new();
    for (domain, preds) in &top {
        for p in preds {
            by_template
                .entry(p.template_id.as_str())
                .or_default()
                .insert(domain, p);
        }
    }

    // Step 3: for each template hit by >=2 domains, record co-fit pairs.
    let mut cofit_templates: BTreeMap<(String, String), BTreeSet<TemplateId>> = BTreeMap::new();
    for (template, domains) in &by_template {
        if domains.len() < 2 {
            continue;
        }
        let domain_ids: Vec<&str> = domains.keys().copied().collect();
        for i in 0..domain_ids.len() {
            for j in (i + 1)..domain_ids.len() {
                let (da, db) = (domain_ids[i], domain_ids[j]);
                let pa = domains[da];
                let pb = domains[db];
                if co_fits(&pa.template_range, &pb.template_range) {
                    cofit_templates
                        .entry((da.to_string(), db.to_string()))
                        .or_default()
                        .insert((*template).to_string());
                }
            }
        }
    }

    // Step 4: decide each pair via supporting-vs-opposing template counts.
    let mut out = Vec::new();
    for ((da, db), shared) in &cofit_templates {
        let supporting = shared.len();
        let opposing_a = opposing_count(&top[da.as_str()], shared);
        let opposing_b = opposing_count(&top[db.as_str()], shared);
        if supporting > opposing_a || supporting > opposing_b {
            out.push(MergeCandidate {
                domain_a: da.clone(),
                domain_b: db.clone(),
                shared_templates: shared.iter().cloned().collect(),
            });
        }
    }
    out
}

/// Count of a domain's own high-confidence, high-coverage hits to
/// templates *outside* the shared set (spec.md §4.O "opposing templates").
fn opposing_count(domain_top: &[&DomainPrediction], shared: &BTreeSet<TemplateId>) -> usize {
    domain_top
        .iter()
        .filter(|p| !shared.contains(&p.template_id) && is_high_confidence_high_coverage(p))
        .count()
}
