//! Stage 2 HHSEARCH (spec.md §4.F): invoking the external sequence-profile
//! search tool is out of scope (spec.md §1); this stage only consumes the
//! raw text the caller attached to [`ChainContext::hhsearch_raw`] before
//! the driver started, parses it, and persists the `P.hhsearch` artifact
//! verbatim for downstream auditability.

use crate::error::StageError;
use crate::pipeline::ChainContext;

use super::write_stage_file;

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let raw = ctx.hhsearch_raw.clone().unwrap_or_default();
    write_stage_file(&ctx.work_dir, &format!("{}.hhsearch", ctx.chain_id), &raw)?;
    ctx.sequence_hits = crate::parsers::hhsearch::parse(&raw)?;
    Ok(())
}
