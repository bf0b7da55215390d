//! Stage 5 MAP_ECOD (spec.md §4.F): for each sequence-profile hit, look up
//! its template in the ECOD hierarchy and keep it only if it still clears
//! the >=10-paired-residue floor (already guaranteed by
//! [`crate::parsers::hhsearch::parse`]). Hits whose template is absent from
//! the hierarchy are dropped — an unmapped template carries no ECOD
//! evidence downstream.
//!
//! Design decision (recorded in DESIGN.md): the `rank` column in spec.md
//! §6's stage 5 schema is the hit's 1-based position in descending-
//! probability order among this chain's mapped hits — stage 8's `rank`
//! (mean `|pos -> set(h_group)|`) is a different, later-computed quantity
//! with the same column name in the source's export.

use crate::config::defaults::MIN_ALIGNED_RESIDUES;
use crate::error::StageError;
use crate::hits::HitEvidence;
use crate::pipeline::ChainContext;
use crate::resid::ResSet;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut mapped = Vec::new();
    for hit in &ctx.sequence_hits {
        if hit.paired_len() < MIN_ALIGNED_RESIDUES {
            continue;
        }
        if ctx.reference.hierarchy.lookup(&hit.template_id).is_none() {
            continue;
        }
        mapped.push(hit.clone());
    }
    mapped.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.template_id.cmp(&b.template_id))
    });

    let rows: Vec<String> = mapped
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let row = ctx.reference.hierarchy.lookup(&hit.template_id).expect("checked above");
            let query_range = ResSet::from_ids(hit.query_resids.iter().copied());
            let template_range = ResSet::from_ids(hit.template_resids.iter().copied());
            format!(
                "{}\t{}\t{}\t{:.2}\t{:.3}\t{}\t{}\t{}",
                row.uid,
                row.short_id,
                row.t_group,
                hit.probability,
                hit.coverage().unwrap_or(0.0),
                i + 1,
                template_range.format(),
                query_range.format(),
            )
        })
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.map2ecod.result", ctx.chain_id),
        &super::join_rows(rows),
    )?;
    ctx.ecod_mapped = mapped;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::SequenceHit;
    use crate::refdata::*;
    use std::sync::Arc;

    fn ctx_with_hierarchy() -> ChainContext {
        let hierarchy = EcodHierarchy::parse(std::io::Cursor::new(
            "000000123\te1abcA1\t2002\t2002.1\tA.1.2002.1\n",
        ))
        .unwrap();
        let reference = ReferenceData {
            hierarchy,
            lengths: TemplateLengths::parse(std::io::Cursor::new("")).unwrap(),
            weights: TemplateWeights::new("/tmp"),
            histories: TemplateHistories::new("/tmp"),
            checkpoint: CheckpointFile {
                dense: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
                dense_1: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
            },
        };
        let dir = tempfile::tempdir().unwrap();
        ChainContext::new("P", dir.into_path(), Arc::new(reference))
    }

    #[test]
    fn drops_hits_not_in_hierarchy() {
        let mut ctx = ctx_with_hierarchy();
        ctx.sequence_hits = vec![SequenceHit {
            template_id: "999999999".into(),
            probability: 90.0,
            query_resids: (1..=12).collect(),
            template_resids: (1..=12).collect(),
            template_length: Some(50),
        }];
        run(&mut ctx).unwrap();
        assert!(ctx.ecod_mapped.is_empty());
    }

    #[test]
    fn keeps_and_sorts_mapped_hits() {
        let mut ctx = ctx_with_hierarchy();
        ctx.sequence_hits = vec![SequenceHit {
            template_id: "000000123".into(),
            probability: 90.0,
            query_resids: (1..=12).collect(),
            template_resids: (1..=12).collect(),
            template_length: Some(50),
        }];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.ecod_mapped.len(), 1);
    }
}
