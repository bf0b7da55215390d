//! Parser for secondary-structure assignment output (spec.md §4.C, §4.I
//! stage 11).
//!
//! Expected rows (tab-separated, tolerant of header/blank lines):
//! `resid<TAB>aa<TAB>sse_id<TAB>sse_type` where `sse_type` is one of
//! `H`/`E`/`C` and `sse_id` is `na` for coil. Rows for residues the
//! assigner didn't emit are filled in by the caller as coil (spec.md §4.I:
//! "missing rows -> sse_type = C, sse_id = None").

use std::collections::HashMap;

use crate::error::StageError;
use crate::hits::{SseAssignment, SseType};
use crate::resid::ResId;

const STAGE: &str = "sse";

/// Parse the raw assignment rows into a sparse map; the caller (stage 11)
/// fills in `1..=n` with coil defaults for any residue absent here.
pub fn parse(text: &str) -> Result<HashMap<ResId, SseAssignment>, StageError> {
    let mut out = HashMap::new();
    for line in super::significant_lines(text) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != 4 {
            return Err(StageError::ParseError {
                stage: STAGE,
                detail: format!("expected 4 tab-separated columns, got {}: '{line}'", cols.len()),
            });
        }
        let resid: ResId = cols[0].trim().parse().map_err(|_| StageError::ParseError {
            stage: STAGE,
            detail: format!("bad resid in '{line}'"),
        })?;
        let sse_type = match cols[3].trim() {
            "H" => SseType::Helix,
            "E" => SseType::Strand,
            "C" => SseType::Coil,
            other => {
                return Err(StageError::ParseError {
                    stage: STAGE,
                    detail: format!("unknown sse_type '{other}' in '{line}'"),
                })
            }
        };
        let sse_id = match cols[2].trim() {
            "na" => None,
            id => Some(id.parse().map_err(|_| StageError::ParseError {
                stage: STAGE,
                detail: format!("bad sse_id in '{line}'"),
            })?),
        };
        out.insert(resid, SseAssignment { sse_id, sse_type });
    }
    Ok(out)
}

/// Fill every residue `1..=n` with either its parsed assignment or the coil
/// default (spec.md §4.I).
pub fn fill_full_range(
    sparse: &HashMap<ResId, SseAssignment>,
    n: usize,
) -> Vec<SseAssignment> {
    (1..=n as ResId)
        .map(|r| {
            sparse.get(&r).copied().unwrap_or(SseAssignment {
                sse_id: None,
                sse_type: SseType::Coil,
            })
        })
        .collect()
}
