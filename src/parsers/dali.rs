//! Parser for one pairwise structural-alignment invocation (spec.md §4.C,
//! §4.G) — the "opaque process" stage 7's iterative loop calls once per
//! template per iteration.
//!
//! Expected text shape, tolerant of blank lines:
//! ```text
//! z_score<TAB>num_pairs
//! q_res<TAB>t_res
//! q_res<TAB>t_res
//! ...
//! ```
//! A crashed/empty alignment tool run is represented by the caller as an
//! empty string, which parses to a zero-pair result rather than an error
//! (spec.md §4.G: "an alignment tool crash on a single template records
//! zero hits for that template").

use crate::error::StageError;
use crate::resid::ResId;

const STAGE: &str = "dali_alignment";

/// One parsed pairwise structural alignment.
#[derive(Debug, Clone, Default)]
pub struct AlignmentResult {
    pub z_score: f64,
    pub query_resids: Vec<ResId>,
    pub template_resids: Vec<ResId>,
}

impl AlignmentResult {
    pub fn num_pairs(&self) -> usize {
        self.query_resids.len()
    }
}

/// Parse one alignment-tool invocation's output. An empty/blank input is a
/// valid zero-pair result, not an error (tool-crash semantics, spec.md
/// §4.G).
pub fn parse(text: &str) -> Result<AlignmentResult, StageError> {
    let mut lines = super::significant_lines(text);
    let Some(header) = lines.next() else {
        return Ok(AlignmentResult::default());
    };
    let mut header_cols = header.split('\t');
    let z_score: f64 = header_cols
        .next()
        .ok_or_else(|| StageError::ParseError {
            stage: STAGE,
            detail: "missing z_score header field".to_string(),
        })?
        .trim()
        .parse()
        .map_err(|_| StageError::ParseError {
            stage: STAGE,
            detail: format!("bad z_score in header '{header}'"),
        })?;

    let mut query_resids = Vec::new();
    let mut template_resids = Vec::new();
    for line in lines {
        let mut cols = line.split('\t');
        let q: ResId = cols
            .next()
            .ok_or_else(|| StageError::ParseError {
                stage: STAGE,
                detail: format!("missing q_res in '{line}'"),
            })?
            .trim()
            .parse()
            .map_err(|_| StageError::ParseError {
                stage: STAGE,
                detail: format!("bad q_res in '{line}'"),
            })?;
        let t: ResId = cols
            .next()
            .ok_or_else(|| StageError::ParseError {
                stage: STAGE,
                detail: format!("missing t_res in '{line}'"),
            })?
            .trim()
            .parse()
            .map_err(|_| StageError::ParseError {
                stage: STAGE,
                detail: format!("bad t_res in '{line}'"),
            })?;
        query_resids.push(q);
        template_resids.push(t);
    }

    Ok(AlignmentResult {
        z_score,
        query_resids,
        template_resids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_pairs_not_error() {
        let result = parse("").unwrap();
        assert_eq!(result.num_pairs(), 0);
    }

    #[test]
    fn parses_header_and_pairs() {
        let text = "24.5\t3\n1\t10\n2\t11\n3\t12\n";
        let result = parse(text).unwrap();
        assert_eq!(result.z_score, 24.5);
        assert_eq!(result.num_pairs(), 3);
        assert_eq!(result.query_resids, vec![1, 2, 3]);
        assert_eq!(result.template_resids, vec![10, 11, 12]);
    }
}
