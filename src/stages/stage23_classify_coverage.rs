//! Stage 23 CLASSIFY_COVERAGE (spec.md §4.P): for each merged domain,
//! recompute weighted and length coverage against every template still in
//! play (inherited from its source domains' confident assignments), pick the
//! single best-ranked (domain, template) candidate, and classify it
//! `full`/`part`/`miss`.

use std::collections::HashMap;

use crate::config::defaults::{CLASSIFY_LCOV_FLOOR, CLASSIFY_PROB_FLOOR, CLASSIFY_WCOV_FULL};
use crate::domain::Classification;
use crate::error::StageError;
use crate::pipeline::ChainContext;
use crate::refdata::weights::TemplateWeights;
use crate::resid::ResSet;
use crate::stages::records::Stage23Prediction;

use super::{join_rows, write_stage_file};

fn classify(classifier_prob: f64, weighted_cov: f64, length_cov: f64) -> Classification {
    if classifier_prob >= CLASSIFY_PROB_FLOOR
        && weighted_cov >= CLASSIFY_WCOV_FULL
        && length_cov >= CLASSIFY_LCOV_FLOOR
    {
        Classification::Full
    } else if classifier_prob >= CLASSIFY_PROB_FLOOR
        && (weighted_cov >= CLASSIFY_LCOV_FLOOR || length_cov >= CLASSIFY_LCOV_FLOOR)
    {
        Classification::Part
    } else {
        Classification::Miss
    }
}

/// Rank order for "best full > best part > best miss".
fn classification_rank(c: Classification) -> u8 {
    match c {
        Classification::Full => 0,
        Classification::Part => 1,
        Classification::Miss => 2,
    }
}

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    // template -> aligned residue union, across all domains' stage-18 mappings.
    let mut template_ranges: HashMap<(&str, &str), ResSet> = HashMap::new();
    for m in &ctx.mappings {
        let entry = template_ranges
            .entry((m.domain_id.as_str(), m.template_id.as_str()))
            .or_default();
        if let Some(r) = &m.hh_template_range {
            *entry = entry.union(r);
        }
        if let Some(r) = &m.dali_template_range {
            *entry = entry.union(r);
        }
    }

    let mut predictions = Vec::new();
    for merged in ctx.merged_domains.clone() {
        let candidates: Vec<&crate::stages::records::ConfidentPrediction> = ctx
            .confident
            .iter()
            .filter(|c| merged.source_domains.contains(&c.domain_id))
            .collect();

        let mut templates: Vec<&str> = candidates.iter().map(|c| c.template_id.as_str()).collect();
        templates.sort_unstable();
        templates.dedup();

        let mut best: Option<Stage23Prediction> = None;
        for template_id in templates {
            let matching: Vec<&&crate::stages::records::ConfidentPrediction> = candidates
                .iter()
                .filter(|c| c.template_id == template_id)
                .collect();
            let Some(top) = matching
                .iter()
                .max_by(|a, b| a.classifier_prob.total_cmp(&b.classifier_prob))
            else {
                continue;
            };

            let mut aligned = ResSet::new();
            for domain_id in &merged.source_domains {
                if let Some(r) = template_ranges.get(&(domain_id.as_str(), template_id)) {
                    aligned = aligned.union(r);
                }
            }

            let template_length = ctx.reference.lengths.get(template_id);
            let weighted_cov = template_length
                .filter(|&len| len > 0)
                .map(|len| {
                    let weights = ctx.reference.weights.get(template_id, len);
                    let total: f64 = weights.iter().sum();
                    if total <= 0.0 {
                        0.0
                    } else {
                        let covered: f64 = aligned
                            .iter()
                            .map(|pos| TemplateWeights::weight_at(&weights, pos as usize))
                            .sum();
                        covered / total
                    }
                })
                .unwrap_or(0.0);
            let length_cov = template_length
                .filter(|&len| len > 0)
                .map(|len| aligned.size() as f64 / len as f64)
                .unwrap_or(0.0);

            let classification = classify(top.classifier_prob, weighted_cov, length_cov);
            let candidate = Stage23Prediction {
                domain_id: merged.id.clone(),
                range: merged.resids.format(),
                resids: merged.resids.clone(),
                template_id: template_id.to_string(),
                t_group: top.t_group.clone(),
                h_group: top.h_group.clone(),
                short_ecod_key: top.short_id.clone(),
                classifier_prob: top.classifier_prob,
                quality: top.quality,
                classification,
                weighted_coverage: weighted_cov,
                length_coverage: length_cov,
                hh_prob: top.hh_prob,
            };

            let replace = match &best {
                None => true,
                Some(current) => {
                    let rank_cmp = classification_rank(candidate.classification)
                        .cmp(&classification_rank(current.classification));
                    match rank_cmp {
                        std::cmp::Ordering::Less => true,
                        std::cmp::Ordering::Greater => false,
                        std::cmp::Ordering::Equal => {
                            candidate.classifier_prob > current.classifier_prob
                                || (candidate.classifier_prob == current.classifier_prob
                                    && candidate.template_id < current.template_id)
                        }
                    }
                }
            };
            if replace {
                best = Some(candidate);
            }
        }

        if let Some(prediction) = best {
            predictions.push(prediction);
        }
    }

    let rows: Vec<String> = predictions
        .iter()
        .map(|p| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{:.4}\t{:?}\t{:.3}\t{:.3}",
                p.domain_id,
                p.range,
                p.template_id,
                p.t_group,
                p.short_ecod_key,
                p.classifier_prob,
                p.classification,
                p.weighted_coverage,
                p.length_coverage,
            )
        })
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step23_predictions", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.stage23_predictions = predictions;
    Ok(())
}
