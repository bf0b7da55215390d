//! Parser for sequence-profile (HHsearch-style) search output (spec.md
//! §4.C, stage 2's consumer at stage 5 `MAP_ECOD`).
//!
//! Each hit is one tab-separated record:
//! `template_id<TAB>probability<TAB>template_length<TAB>q_resids<TAB>t_resids`
//! where `q_resids`/`t_resids` are comma-separated, alignment-order,
//! equal-length residue id lists and `template_length` is `na` when
//! unknown. Blank lines and `#`-prefixed header lines are tolerated.

use crate::config::defaults::MIN_ALIGNED_RESIDUES;
use crate::error::StageError;
use crate::hits::SequenceHit;

use super::{parse_resid_list, significant_lines};

const STAGE: &str = "hhsearch";

/// Parse raw HHsearch-style output into [`SequenceHit`]s, dropping any hit
/// with fewer than [`MIN_ALIGNED_RESIDUES`] paired residues (spec.md §4.C).
pub fn parse(text: &str) -> Result<Vec<SequenceHit>, StageError> {
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
        let probability: f64 = cols[1].trim().parse().map_err(|_| StageError::ParseError {
            stage: STAGE,
            detail: format!("bad probability in '{line}'"),
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
        hits.push(SequenceHit {
            template_id,
            probability,
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
    fn parses_tolerating_header_and_blank_lines() {
        let text = "# template_id\tprob\tlen\tq\tt\n\
                     template_id\tprob\tlen\tq\tt\n\
                     000000123\t92.5\t150\t1,2,3,4,5,6,7,8,9,10\t5,6,7,8,9,10,11,12,13,14\n\
                     \n";
        let hits = parse(text).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].probability, 92.5);
        assert_eq!(hits[0].template_length, Some(150));
    }

    #[test]
    fn drops_short_hits() {
        let text = "000000123\t92.5\tna\t1,2,3\t5,6,7\n";
        assert!(parse(text).unwrap().is_empty());
    }

    #[test]
    fn rejects_mismatched_pair_lengths() {
        let text = "000000123\t92.5\tna\t1,2,3,4,5,6,7,8,9,10\t5,6,7\n";
        assert!(parse(text).is_err());
    }
}
