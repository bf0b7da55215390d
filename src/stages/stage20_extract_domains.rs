//! Stage 20 EXTRACT_DOMAINS (spec.md §4.O): write a coordinate file per
//! domain that appears in any proposed merge candidate, filtering ATOM
//! records down to that domain's residues.

use std::collections::BTreeSet;

use crate::error::StageError;
use crate::pipeline::ChainContext;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let Some(structure) = ctx.structure.as_ref() else {
        return Err(StageError::InputMissing {
            stage: "extract_domains",
            path: ctx.work_dir.join(format!("{}.pdb", ctx.chain_id)),
        });
    };

    let mut wanted: BTreeSet<&str> = BTreeSet::new();
    for c in &ctx.merge_candidates {
        wanted.insert(c.domain_a.as_str());
        wanted.insert(c.domain_b.as_str());
    }

    let mut extracted = std::collections::BTreeMap::new();
    for domain in &ctx.domains {
        if !wanted.contains(domain.id.as_str()) {
            continue;
        }
        let subset = structure.subset(&domain.resids);
        let pdb_text = subset.to_pdb_string();
        write_stage_file(
            &ctx.work_dir,
            &format!("{}_{}.pdb", ctx.chain_id, domain.id),
            &pdb_text,
        )?;
        extracted.insert(domain.id.clone(), pdb_text);
    }

    // Manifest of the per-domain PDBs just written, named to match the
    // registry's resume check (spec.md §4.E "all output files exist") —
    // the per-domain files themselves are named by domain id, not
    // predictably enumerable from the chain id alone.
    let manifest = super::join_rows(extracted.keys().map(|id| format!("{}_{id}.pdb", ctx.chain_id)));
    write_stage_file(&ctx.work_dir, &format!("{}.step20_extracted", ctx.chain_id), &manifest)?;

    ctx.extracted_domain_pdbs = extracted;
    Ok(())
}
