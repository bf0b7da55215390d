//! Stage 8 GOOD_HITS (spec.md §4.H): score and percentile every hit from
//! both evidence channels, processed in descending score order while
//! tracking how many distinct h-groups have already claimed each query
//! position — the basis of the `rank` column.
//!
//! Design decision (DESIGN.md): spec.md's "process hits in descending z
//! order" is stated for the structural channel; this implementation
//! applies the same single total order (each hit's own channel-appropriate
//! score: probability for sequence, z-score for structural) across *both*
//! channels together, since stage 8's output table is unified and the
//! `pos -> set(h_group)` bookkeeping spec.md describes is explicitly
//! cross-channel ("maintain... seen-so-far" with no channel qualifier).

use std::collections::{HashMap, HashSet};

use ordered_float::OrderedFloat;

use crate::error::StageError;
use crate::hits::HitEvidence;
use crate::pipeline::ChainContext;
use crate::resid::ResSet;
use crate::stages::records::{EvidenceSource, GoodHit};

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut entries: Vec<(EvidenceSource, crate::hits::Hit)> = Vec::new();
    entries.extend(ctx.ecod_mapped.iter().cloned().map(|h| (EvidenceSource::Sequence, crate::hits::Hit::Sequence(h))));
    entries.extend(ctx.foldseek_filtered.iter().cloned().map(|h| (EvidenceSource::Structural, crate::hits::Hit::Structural(h))));
    entries.extend(ctx.iterative_hits.iter().cloned().map(|h| (EvidenceSource::Structural, crate::hits::Hit::Structural(h))));

    // Descending score, total order via `OrderedFloat` (spec.md §9: every
    // sort that affects output needs an explicit, total comparator — plain
    // `partial_cmp` folds NaN into "equal", which isn't transitive).
    entries.sort_by(|a, b| {
        OrderedFloat(b.1.score())
            .cmp(&OrderedFloat(a.1.score()))
            .then_with(|| a.1.template_id().cmp(b.1.template_id()))
    });

    let mut pos_groups: HashMap<u32, HashSet<String>> = HashMap::new();
    let mut good_hits = Vec::with_capacity(entries.len());

    for (source, hit) in entries {
        let template_id = hit.template_id().to_string();
        let row = ctx.reference.hierarchy.lookup(&template_id);
        let t_group = row.map(|r| r.t_group.clone()).unwrap_or_default();
        let h_group = row.map(|r| r.h_group.clone()).unwrap_or_default();
        let short_id = row.map(|r| r.short_id.clone()).unwrap_or_else(|| template_id.clone());

        let template_length = hit
            .template_length()
            .or_else(|| ctx.reference.lengths.get(&template_id))
            .unwrap_or_else(|| hit.template_resids().len().max(1));
        let coverage = hit.query_resids().len() as f64 / template_length as f64;

        let q_score = if ctx.reference.weights.has_file(&template_id) {
            let weights = ctx.reference.weights.get(&template_id, template_length);
            let total: f64 = weights.iter().sum();
            let covered: f64 = hit
                .template_resids()
                .iter()
                .map(|&t| crate::refdata::weights::TemplateWeights::weight_at(&weights, t as usize))
                .sum();
            if total > 0.0 { covered / total } else { -1.0 }
        } else {
            -1.0
        };

        let z_tile = ctx.reference.histories.z_tile(&template_id, hit.score());
        let q_tile = ctx.reference.histories.q_tile(&template_id, hit.score());

        for &pos in hit.query_resids() {
            pos_groups.entry(pos).or_default().insert(h_group.clone());
        }
        let rank = if hit.query_resids().is_empty() {
            0.0
        } else {
            let sum: usize = hit
                .query_resids()
                .iter()
                .map(|p| pos_groups.get(p).map_or(0, HashSet::len))
                .sum();
            sum as f64 / hit.query_resids().len() as f64
        };

        good_hits.push(GoodHit {
            source,
            template_uid: template_id,
            short_id,
            t_group,
            h_group,
            score: hit.score(),
            coverage,
            template_length,
            q_score,
            z_tile,
            q_tile,
            rank,
            query_range: ResSet::from_ids(hit.query_resids().iter().copied()),
            template_range: ResSet::from_ids(hit.template_resids().iter().copied()),
            query_resids: hit.query_resids().to_vec(),
            template_resids: hit.template_resids().to_vec(),
        });
    }

    let rows: Vec<String> = good_hits.iter().map(GoodHit::to_row).collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}_good_hits", ctx.chain_id),
        &super::join_rows(rows),
    )?;
    ctx.good_hits = good_hits;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::SequenceHit;
    use crate::refdata::*;
    use std::sync::Arc;

    #[test]
    fn rank_grows_as_more_hgroups_claim_a_position() {
        let hierarchy = EcodHierarchy::parse(std::io::Cursor::new(
            "000000001\te1\t1000\t1000.1\tA\n000000002\te2\t2000\t2000.1\tB\n",
        ))
        .unwrap();
        let reference = ReferenceData {
            hierarchy,
            lengths: TemplateLengths::parse(std::io::Cursor::new("")).unwrap(),
            weights: TemplateWeights::new("/tmp/doesnotexist"),
            histories: TemplateHistories::new("/tmp/doesnotexist"),
            checkpoint: CheckpointFile {
                dense: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
                dense_1: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
            },
        };
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.path().to_path_buf(), Arc::new(reference));
        ctx.ecod_mapped = vec![
            SequenceHit {
                template_id: "000000001".into(),
                probability: 95.0,
                query_resids: (1..=15).collect(),
                template_resids: (1..=15).collect(),
                template_length: Some(100),
            },
            SequenceHit {
                template_id: "000000002".into(),
                probability: 80.0,
                query_resids: (10..=25).collect(),
                template_resids: (1..=16).collect(),
                template_length: Some(100),
            },
        ];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.good_hits.len(), 2);
        // second (lower prob) hit overlaps positions 10-15 with the first,
        // so its rank should be >= 1 there.
        let second = &ctx.good_hits[1];
        assert!(second.rank >= 1.0);
        assert_eq!(ctx.good_hits[0].q_score, -1.0);
    }
}
