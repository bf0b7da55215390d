//! Stage 1 PREPARE (spec.md §4.F): extract the sequence and emit a
//! standardized coordinate file. The raw coordinate file itself is loaded
//! by the caller before the driver starts (spec.md §4.B); this stage
//! validates that structure and writes the two canonical artifacts
//! (`P.fa`, `P.pdb`) every later stage can depend on existing in a fixed
//! shape.

use crate::error::StageError;
use crate::pipeline::ChainContext;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let structure = ctx.structure.as_ref().ok_or_else(|| StageError::InputMissing {
        stage: "PREPARE",
        path: ctx.work_dir.join(format!("{}.input", ctx.chain_id)),
    })?;

    if structure.n() == 0 {
        return Err(StageError::InvariantViolation(
            "structure has zero residues".to_string(),
        ));
    }

    let fasta = format_fasta(&ctx.chain_id, structure.seq());
    write_stage_file(&ctx.work_dir, &format!("{}.fa", ctx.chain_id), &fasta)?;
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.pdb", ctx.chain_id),
        &structure.to_pdb_string(),
    )?;
    Ok(())
}

fn format_fasta(chain_id: &str, seq: &[char]) -> String {
    let mut out = format!(">{chain_id}\n");
    out.push_str(&seq.iter().collect::<String>());
    out.push('\n');
    out
}
