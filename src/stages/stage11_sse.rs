//! Stage 11 SSE (spec.md §4.I): parse the secondary-structure assigner's
//! output and fill every residue `1..=N`, coil by default.

use crate::error::StageError;
use crate::parsers::sse;
use crate::pipeline::ChainContext;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let Some(structure) = ctx.structure.as_ref() else {
        return Err(StageError::InputMissing {
            stage: "SSE",
            path: ctx.work_dir.join(format!("{}.pdb", ctx.chain_id)),
        });
    };
    let n = structure.n();
    let sparse = sse::parse(ctx.sse_raw.as_deref().unwrap_or(""))?;
    let assignments = sse::fill_full_range(&sparse, n);

    let rows: Vec<String> = assignments
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let resid = i + 1;
            let aa = structure.seq().get(i).copied().unwrap_or('X');
            let type_char = match a.sse_type {
                crate::hits::SseType::Helix => "H",
                crate::hits::SseType::Strand => "E",
                crate::hits::SseType::Coil => "C",
            };
            let sse_id = a.sse_id.map(|id| id.to_string()).unwrap_or_else(|| "na".to_string());
            format!("{resid}\t{aa}\t{sse_id}\t{type_char}")
        })
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.sse", ctx.chain_id),
        &super::join_rows(rows),
    )?;
    ctx.sse = assignments;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdata::*;
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
    fn fills_missing_residues_as_coil_at_stage_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        let seq = vec!['A'; 4];
        let atoms = vec![Atom { resid: 1, atom_name: "CA".into(), element: "C".into(), x: 0.0, y: 0.0, z: 0.0 }];
        ctx.structure = Some(Structure::new(seq, atoms).unwrap());
        ctx.sse_raw = Some("1\tA\t1\tH\n".to_string());
        run(&mut ctx).unwrap();
        assert_eq!(ctx.sse.len(), 4);
        assert_eq!(ctx.sse[0].sse_type, crate::hits::SseType::Helix);
        assert_eq!(ctx.sse[3].sse_type, crate::hits::SseType::Coil);
    }
}
