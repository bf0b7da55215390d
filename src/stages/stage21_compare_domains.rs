//! Stage 21 COMPARE_DOMAINS (spec.md §4.O): thin adapter running
//! [`crate::merge::judge`] over every proposed candidate pair.

use crate::error::StageError;
use crate::pipeline::ChainContext;
use crate::stages::records::ComparisonRow;

use super::{join_rows, write_stage_file};

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let Some(structure) = ctx.structure.as_ref() else {
        return Err(StageError::InputMissing {
            stage: "compare_domains",
            path: ctx.work_dir.join(format!("{}.pdb", ctx.chain_id)),
        });
    };
    let structured_sorted: Vec<u32> = structure.structured_residues().iter().collect();

    let domains: std::collections::HashMap<&str, &crate::resid::ResSet> =
        ctx.domains.iter().map(|d| (d.id.as_str(), &d.resids)).collect();

    let mut comparisons = Vec::new();
    for candidate in &ctx.merge_candidates {
        let (Some(a), Some(b)) = (
            domains.get(candidate.domain_a.as_str()),
            domains.get(candidate.domain_b.as_str()),
        ) else {
            continue;
        };
        let judgment = crate::merge::judge(a, b, &structured_sorted, structure);
        comparisons.push(ComparisonRow {
            domain_a: candidate.domain_a.clone(),
            domain_b: candidate.domain_b.clone(),
            judgment,
        });
    }

    let rows: Vec<String> = comparisons
        .iter()
        .map(|c| format!("{}\t{}\t{}", c.domain_a, c.domain_b, c.judgment.code()))
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step21_comparisons", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.comparisons = comparisons;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::merge::MergeCandidate;
    use crate::refdata::*;
    use crate::resid::ResSet;
    use crate::structure::{Atom, Structure};
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
    fn adjacent_domains_are_sequence_connected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        let seq = vec!['A'; 20];
        let atoms: Vec<Atom> = (1..=20)
            .flat_map(|r| {
                vec![
                    Atom { resid: r, atom_name: "N".into(), element: "N".into(), x: f64::from(r), y: 0.0, z: 0.0 },
                    Atom { resid: r, atom_name: "CA".into(), element: "C".into(), x: f64::from(r), y: 0.0, z: 0.0 },
                    Atom { resid: r, atom_name: "C".into(), element: "C".into(), x: f64::from(r), y: 0.0, z: 0.0 },
                    Atom { resid: r, atom_name: "O".into(), element: "O".into(), x: f64::from(r), y: 0.0, z: 0.0 },
                ]
            })
            .collect();
        ctx.structure = Some(Structure::new(seq, atoms).unwrap());
        ctx.domains = vec![
            Domain::new("D1", ResSet::parse("1-10").unwrap()),
            Domain::new("D2", ResSet::parse("11-20").unwrap()),
        ];
        ctx.merge_candidates = vec![MergeCandidate {
            domain_a: "D1".into(),
            domain_b: "D2".into(),
            shared_templates: vec!["t1".into()],
        }];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.comparisons.len(), 1);
        assert_eq!(ctx.comparisons[0].judgment, crate::merge::Judgment::Sequence);
    }
}
