//! Stage 12 DISORDER (spec.md §4.I): a residue is disordered iff its pLDDT
//! is below the confidence floor *and* the local window of pair-confidence
//! (PAE) shows high uncertainty.
//!
//! Design decision (DESIGN.md): "local window shows high pair-confidence
//! uncertainty" is operationalized as the mean PAE between `i` and every
//! other residue within [`crate::config::defaults::DISORDER_PAE_WINDOW`]
//! positions exceeding [`crate::config::defaults::DISORDER_PAE_THRESHOLD`].
//! A chain with no PAE matrix can't evaluate the second condition, so no
//! residue is marked disordered — the set of known-ordered flags is a
//! subset of what a true PAE-bearing run would report, never a superset.

use crate::config::defaults::{DISORDER_PAE_THRESHOLD, DISORDER_PAE_WINDOW, DISORDER_PLDDT_THRESHOLD};
use crate::error::StageError;
use crate::pipeline::ChainContext;
use crate::resid::ResSet;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let Some(structure) = ctx.structure.as_ref() else {
        return Err(StageError::InputMissing {
            stage: "DISORDER",
            path: ctx.work_dir.join(format!("{}.pdb", ctx.chain_id)),
        });
    };
    let n = structure.n() as u32;
    let mut disorder = ResSet::new();

    if let Some(pae) = structure.pae() {
        for i in 1..=n {
            if structure.plddt(i) >= DISORDER_PLDDT_THRESHOLD {
                continue;
            }
            let lo = i.saturating_sub(DISORDER_PAE_WINDOW).max(1);
            let hi = (i + DISORDER_PAE_WINDOW).min(n);
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for j in lo..=hi {
                if j == i {
                    continue;
                }
                sum += pae.get(i, j) as f64;
                count += 1;
            }
            if count == 0 {
                continue;
            }
            let mean_pae = sum / count as f64;
            if mean_pae > DISORDER_PAE_THRESHOLD as f64 {
                disorder.insert(i);
            }
        }
    }

    write_stage_file(
        &ctx.work_dir,
        &format!("{}.diso", ctx.chain_id),
        &format!("{}\n", disorder.format()),
    )?;
    ctx.disorder = disorder;
    Ok(())
}
