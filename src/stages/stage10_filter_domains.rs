//! Stage 10 FILTER_DOMAINS (spec.md §4.H): union stage 9's sequence and
//! structure support lists into the unified `*.goodDomains` table, one row
//! per hit, preserving source type.

use crate::error::StageError;
use crate::pipeline::ChainContext;

use super::{join_rows, write_stage_file};

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut rows = Vec::new();
    let mut good_domains = Vec::new();
    for hit in ctx.support_sequence.iter().chain(ctx.support_structure.iter()) {
        rows.push(hit.to_good_domains_row(&ctx.chain_id));
        good_domains.push(hit.clone());
    }

    write_stage_file(
        &ctx.work_dir,
        &format!("{}.goodDomains", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.good_domains = good_domains;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdata::*;
    use crate::resid::ResSet;
    use crate::stages::records::{EvidenceSource, GoodHit};
    use std::sync::Arc;

    #[test]
    fn unions_both_support_channels_preserving_source() {
        let reference = Arc::new(ReferenceData {
            hierarchy: EcodHierarchy::parse(std::io::Cursor::new("")).unwrap(),
            lengths: TemplateLengths::parse(std::io::Cursor::new("")).unwrap(),
            weights: TemplateWeights::new("/tmp"),
            histories: TemplateHistories::new("/tmp"),
            checkpoint: CheckpointFile {
                dense: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
                dense_1: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
            },
        });
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), reference);
        let mk = |source, t: &str| GoodHit {
            source,
            template_uid: t.to_string(),
            short_id: t.to_string(),
            t_group: "1.1".into(),
            h_group: "1".into(),
            score: 50.0,
            coverage: 0.5,
            template_length: 10,
            q_score: -1.0,
            z_tile: -1.0,
            q_tile: -1.0,
            rank: 1.0,
            query_range: ResSet::parse("1-10").unwrap(),
            template_range: ResSet::parse("1-10").unwrap(),
            query_resids: (1..=10).collect(),
            template_resids: (1..=10).collect(),
        };
        ctx.support_sequence = vec![mk(EvidenceSource::Sequence, "t1")];
        ctx.support_structure = vec![mk(EvidenceSource::Structural, "t2")];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.good_domains.len(), 2);
    }
}
