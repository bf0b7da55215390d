//! Stage 9 GET_SUPPORT (spec.md §4.H): group stage 8's hits into
//! preliminary, ad hoc domains by query-range overlap (the real domain
//! partition is stage 13's job, which hasn't run yet), then forward a hit to
//! its group's sequence/structure support list only if it brings >=50% new
//! template residues relative to the group's already-covered set.
//!
//! Design decision (DESIGN.md): spec.md leaves "predicted domains (from a
//! preliminary stage...)" unspecified at this point in the pipeline. This
//! implementation unions hits whose query ranges share at least one residue
//! into a single preliminary group via [`crate::merge::UnionFind`], processed
//! group-by-group, each group's hits walked in stage 8's own descending-score
//! order. No probability/coverage threshold is applied, matching spec.md's
//! explicit instruction.

use crate::error::StageError;
use crate::merge::UnionFind;
use crate::pipeline::ChainContext;
use crate::resid::ResSet;
use crate::stages::records::{EvidenceSource, GoodHit};

use super::{join_rows, write_stage_file};

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let hits = &ctx.good_hits;
    let n = hits.len();
    let mut uf = UnionFind::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if !hits[i].query_range.intersect(&hits[j].query_range).is_empty() {
                uf.union(i, j);
            }
        }
    }

    let mut support_sequence = Vec::new();
    let mut support_structure = Vec::new();

    for group in uf.components() {
        let mut covered = ResSet::new();
        for &idx in &group {
            let hit = &hits[idx];
            let template_range = &hit.template_range;
            let new_residues = template_range.difference(&covered).size();
            let brings_enough_new = template_range.is_empty()
                || new_residues as f64 >= 0.5 * template_range.size() as f64;
            if !brings_enough_new {
                continue;
            }
            covered = covered.union(template_range);
            match hit.source {
                EvidenceSource::Sequence => support_sequence.push(hit.clone()),
                EvidenceSource::Structural => support_structure.push(hit.clone()),
            }
        }
    }

    write_support_file(ctx, "sequence", &support_sequence)?;
    write_support_file(ctx, "structure", &support_structure)?;

    ctx.support_sequence = support_sequence;
    ctx.support_structure = support_structure;
    Ok(())
}

fn write_support_file(ctx: &ChainContext, suffix: &str, hits: &[GoodHit]) -> Result<(), StageError> {
    let rows: Vec<String> = hits.iter().map(GoodHit::to_row).collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}_{}.result", ctx.chain_id, suffix),
        &join_rows(rows),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdata::*;
    use std::sync::Arc;

    fn empty_reference() -> Arc<ReferenceData> {
        Arc::new(ReferenceData {
            hierarchy: EcodHierarchy::parse(std::io::Cursor::new("")).unwrap(),
            lengths: TemplateLengths::parse(std::io::Cursor::new("")).unwrap(),
            weights: TemplateWeights::new("/tmp"),
            histories: TemplateHistories::new("/tmp"),
            checkpoint: CheckpointFile {
                dense: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
                dense_1: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
            },
        })
    }

    fn hit(source: EvidenceSource, template: &str, q: &[u32], t: &[u32]) -> GoodHit {
        GoodHit {
            source,
            template_uid: template.to_string(),
            short_id: template.to_string(),
            t_group: "1.1".to_string(),
            h_group: "1".to_string(),
            score: 90.0,
            coverage: 1.0,
            template_length: t.len().max(1),
            q_score: -1.0,
            z_tile: -1.0,
            q_tile: -1.0,
            rank: 1.0,
            query_range: ResSet::from_ids(q.iter().copied()),
            template_range: ResSet::from_ids(t.iter().copied()),
            query_resids: q.to_vec(),
            template_resids: t.to_vec(),
        }
    }

    #[test]
    fn second_hit_with_fully_redundant_template_coverage_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.good_hits = vec![
            hit(EvidenceSource::Sequence, "t1", &[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5]),
            hit(EvidenceSource::Sequence, "t2", &[2, 3, 4, 5, 6], &[1, 2, 3, 4, 5]),
        ];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.support_sequence.len(), 1);
    }

    #[test]
    fn non_overlapping_query_ranges_form_separate_groups_and_both_forward() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.good_hits = vec![
            hit(EvidenceSource::Sequence, "t1", &[1, 2, 3], &[1, 2, 3]),
            hit(EvidenceSource::Structural, "t2", &[100, 101, 102], &[1, 2, 3]),
        ];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.support_sequence.len(), 1);
        assert_eq!(ctx.support_structure.len(), 1);
    }
}
