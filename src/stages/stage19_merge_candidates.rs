//! Stage 19 CANDIDATES (spec.md §4.O): thin adapter turning stage 17/18's
//! per-domain confident predictions and template mappings into the
//! [`crate::merge::propose_candidates`] input shape, then back into a
//! [`ChainContext`] field and text artifact.

use std::collections::HashMap;

use crate::error::StageError;
use crate::merge::{propose_candidates, DomainPrediction};
use crate::pipeline::ChainContext;
use crate::resid::ResSet;

use super::{join_rows, write_stage_file};

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut mapped_range: HashMap<(&str, &str), ResSet> = HashMap::new();
    for m in &ctx.mappings {
        let mut range = ResSet::new();
        if let Some(r) = &m.hh_template_range {
            range = range.union(r);
        }
        if let Some(r) = &m.dali_template_range {
            range = range.union(r);
        }
        mapped_range.insert((m.domain_id.as_str(), m.template_id.as_str()), range);
    }

    let predictions: Vec<DomainPrediction> = ctx
        .confident
        .iter()
        .map(|c| {
            let template_range = mapped_range
                .get(&(c.domain_id.as_str(), c.template_id.as_str()))
                .cloned()
                .unwrap_or_default();
            let length_coverage = ctx
                .reference
                .lengths
                .get(&c.template_id)
                .filter(|&len| len > 0)
                .map(|len| template_range.size() as f64 / len as f64)
                .unwrap_or(0.0);
            DomainPrediction {
                domain_id: c.domain_id.clone(),
                template_id: c.template_id.clone(),
                probability: c.classifier_prob,
                template_range,
                length_coverage,
            }
        })
        .collect();

    let candidates = propose_candidates(&predictions);

    let rows: Vec<String> = candidates
        .iter()
        .map(|c| format!("{}\t{}\t{}", c.domain_a, c.domain_b, c.shared_templates.join(",")))
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step19_merge_candidates", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.merge_candidates = candidates;
    Ok(())
}
