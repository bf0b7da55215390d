//! Stage 22 MERGE_DOMAINS (spec.md §4.O): transitive-closure union of every
//! domain pair whose comparison judgment was non-neutral. Domains that were
//! never a candidate, or whose candidacy was rejected in stage 21, survive
//! as their own singleton component.

use std::collections::HashMap;

use crate::error::StageError;
use crate::merge::UnionFind;
use crate::pipeline::ChainContext;
use crate::stages::records::MergedDomain;

use super::{join_rows, write_stage_file};

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (i, domain) in ctx.domains.iter().enumerate() {
        index_of.insert(domain.id.as_str(), i);
    }

    let mut uf = UnionFind::new(ctx.domains.len());
    for comparison in &ctx.comparisons {
        if comparison.judgment == crate::merge::Judgment::Neither {
            continue;
        }
        let (Some(&a), Some(&b)) = (
            index_of.get(comparison.domain_a.as_str()),
            index_of.get(comparison.domain_b.as_str()),
        ) else {
            continue;
        };
        uf.union(a, b);
    }

    let mut merged = Vec::new();
    for (component_idx, component) in uf.components().into_iter().enumerate() {
        let mut resids = crate::resid::ResSet::new();
        let mut source_domains = Vec::new();
        for idx in component {
            let domain = &ctx.domains[idx];
            resids = resids.union(&domain.resids);
            source_domains.push(domain.id.clone());
        }
        source_domains.sort_unstable();
        merged.push(MergedDomain {
            id: format!("M{}", component_idx + 1),
            resids,
            source_domains,
        });
    }

    let rows: Vec<String> = merged
        .iter()
        .map(|m| format!("{}\t{}\t{}", m.id, m.resids.format(), m.source_domains.join(",")))
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step22_merged_domains", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.merged_domains = merged;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::refdata::*;
    use crate::resid::ResSet;
    use crate::stages::records::ComparisonRow;
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

    #[test]
    fn unmerged_domain_survives_as_singleton() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.domains = vec![
            Domain::new("D1", ResSet::parse("1-20").unwrap()),
            Domain::new("D2", ResSet::parse("30-50").unwrap()),
            Domain::new("D3", ResSet::parse("60-80").unwrap()),
        ];
        ctx.comparisons = vec![ComparisonRow {
            domain_a: "D1".into(),
            domain_b: "D2".into(),
            judgment: crate::merge::Judgment::Sequence,
        }];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.merged_domains.len(), 2);
        let sizes: Vec<usize> = ctx.merged_domains.iter().map(|m| m.source_domains.len()).collect();
        assert!(sizes.contains(&2));
        assert!(sizes.contains(&1));
    }

    #[test]
    fn rejected_comparison_does_not_merge() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.domains = vec![
            Domain::new("D1", ResSet::parse("1-20").unwrap()),
            Domain::new("D2", ResSet::parse("30-50").unwrap()),
        ];
        ctx.comparisons = vec![ComparisonRow {
            domain_a: "D1".into(),
            domain_b: "D2".into(),
            judgment: crate::merge::Judgment::Neither,
        }];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.merged_domains.len(), 2);
    }
}
