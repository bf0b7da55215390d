//! Stage 4 FILTER_FOLDSEEK (spec.md §4.F): within each template, retain only
//! the single hit with the largest number of paired residues; the <10
//! residue floor is already enforced by [`crate::parsers::foldseek::parse`].

use std::collections::HashMap;

use crate::error::StageError;
use crate::hits::HitEvidence;
use crate::pipeline::ChainContext;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut best_by_template: HashMap<&str, &crate::hits::StructuralHit> = HashMap::new();
    for hit in &ctx.structural_hits {
        best_by_template
            .entry(hit.template_id.as_str())
            .and_modify(|current| {
                if hit.paired_len() > current.paired_len() {
                    *current = hit;
                }
            })
            .or_insert(hit);
    }

    let mut filtered: Vec<crate::hits::StructuralHit> =
        best_by_template.values().map(|h| (*h).clone()).collect();
    filtered.sort_by(|a, b| a.template_id.cmp(&b.template_id));

    let rows: Vec<String> = filtered
        .iter()
        .map(|h| {
            format!(
                "{}\t{:.2}\t{}\t{}\t{}",
                h.template_id,
                h.z_score,
                h.template_length.map_or("na".to_string(), |l| l.to_string()),
                h.query_resids.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
                h.template_resids.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            )
        })
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.foldseek.flt.result", ctx.chain_id),
        &super::join_rows(rows),
    )?;
    ctx.foldseek_filtered = filtered;
    Ok(())
}
