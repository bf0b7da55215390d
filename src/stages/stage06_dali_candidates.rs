//! Stage 6 DALI_CANDIDATES (spec.md §4.F): union of template ids from
//! stage 5 and stage 4, sorted for reproducibility, one per line.

use std::collections::BTreeSet;

use crate::error::StageError;
use crate::pipeline::ChainContext;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    candidates.extend(ctx.ecod_mapped.iter().map(|h| h.template_id.clone()));
    candidates.extend(ctx.foldseek_filtered.iter().map(|h| h.template_id.clone()));

    let list: Vec<String> = candidates.into_iter().collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}_hits4Dali", ctx.chain_id),
        &super::join_rows(list.iter().cloned()),
    )?;
    ctx.dali_candidates = list;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::{SequenceHit, StructuralHit};
    use crate::refdata::*;
    use std::sync::Arc;

    #[test]
    fn unions_and_sorts_template_ids() {
        let reference = ReferenceData {
            hierarchy: EcodHierarchy::parse(std::io::Cursor::new("")).unwrap(),
            lengths: TemplateLengths::parse(std::io::Cursor::new("")).unwrap(),
            weights: TemplateWeights::new("/tmp"),
            histories: TemplateHistories::new("/tmp"),
            checkpoint: CheckpointFile {
                dense: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
                dense_1: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
            },
        };
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), Arc::new(reference));
        ctx.ecod_mapped = vec![SequenceHit {
            template_id: "000000200".into(),
            probability: 90.0,
            query_resids: vec![1],
            template_resids: vec![1],
            template_length: None,
        }];
        ctx.foldseek_filtered = vec![StructuralHit {
            template_id: "000000100".into(),
            z_score: 10.0,
            query_resids: vec![1],
            template_resids: vec![1],
            template_length: None,
        }];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.dali_candidates, vec!["000000100", "000000200"]);
    }
}
