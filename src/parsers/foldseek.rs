//! Parser for fast-structure-search (Foldseek-style) output (spec.md §4.C,
//! consumed by stage 4 `FILTER_FOLDSEEK`).
//!
//! Same tab-separated record shape as [`super::hhsearch`], but the score
//! column is a `z_score` rather than a probability:
//! `template_id<TAB>z_score<TAB>template_length<TAB>q_resids<TAB>t_resids`.

use crate::config::defaults::MIN_ALIGNED_RESIDUES;
use crate::error::StageError;
use crate::hits::StructuralHit;

use super::{parse_resid_list, significant_lines};

const STAGE: &str = "foldseek";

/// Parse raw Foldseek-style output into [`StructuralHit`]s, dropping any
/// hit with fewer than [`MIN_ALIGNED_RESIDUES`] paired residues.
pub fn parse(text: &str) -> Result<Vec<StructuralHit>, StageError> {
    let mut hits = Vec::new();
    for line in significant_lines(text) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != 5 {
            return Err(StageError::ParseError {
                stage: STAGE,
                detail: format!("expected 5 tab-separated columns, got {}: '{line}'", cols.len()),
            });
        }
        let template_id = cols[0].to_string();
        let z_score: f64 = cols[1].trim().parse().map_err(|_| StageError::ParseError {
            stage: STAGE,
            detail: format!("bad z_score in '{line}'"),
        })?;
        let template_length = parse_optional_len(cols[2])?;
        let query_resids = parse_resid_list(cols[3], STAGE)?;
        let template_resids = parse_resid_list(cols[4], STAGE)?;
        if query_resids.len() != template_resids.len() {
            return Err(StageError::ParseError {
                stage: STAGE,
                detail: format!(
                    "mismatched pair lengths ({} vs {}) in '{line}'",
                    query_resids.len(),
                    template_resids.len()
                ),
            });
        }
        if query_resids.len() < MIN_ALIGNED_RESIDUES {
            continue;
        }
        hits.push(StructuralHit {
            template_id,
            z_score,
            query_resids,
            template_resids,
            template_length,
        });
    }
    Ok(hits)
}

fn parse_optional_len(field: &str) -> Result<Option<usize>, StageError> {
    let field = field.trim();
    if field == "na" {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| StageError::ParseError {
            stage: STAGE,
            detail: format!("bad template_length '{field}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_record() {
        let text = "000000999\t18.4\t200\t1,2,3,4,5,6,7,8,9,10,11\t1,2,3,4,5,6,7,8,9,10,11\n";
        let hits = parse(text).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].z_score, 18.4);
    }

    #[test]
    fn drops_short_hits() {
        let text = "000000999\t18.4\tna\t1,2\t1,2\n";
        assert!(parse(text).unwrap().is_empty());
    }
}
