//! Stage 3 FOLDSEEK (spec.md §4.F): invoking the external fast-structure
//! search tool is out of scope (spec.md §1); parses the raw text the
//! caller attached to [`ChainContext::foldseek_raw`].

use crate::error::StageError;
use crate::pipeline::ChainContext;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let raw = ctx.foldseek_raw.clone().unwrap_or_default();
    write_stage_file(&ctx.work_dir, &format!("{}.foldseek", ctx.chain_id), &raw)?;
    ctx.structural_hits = crate::parsers::foldseek::parse(&raw)?;
    Ok(())
}
