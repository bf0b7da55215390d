//! Sequence and structural connectivity tests for proposed domain merges
//! (spec.md §4.O stage 21 `COMPARE_DOMAINS`).

use crate::config::defaults::{
    SEQ_CONNECTIVITY_MAX_GAP, STRUCT_CONNECTIVITY_DIST_A, STRUCT_CONNECTIVITY_MIN_PAIRS,
};
use crate::resid::ResSet;
use crate::structure::Structure;

/// Connectivity judgment between two proposed domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    /// Neither test passed — reject the merge.
    Neither,
    /// Sequence-connected (checked first).
    Sequence,
    /// Structure-connected.
    Structural,
}

impl Judgment {
    /// Numeric encoding from spec.md §4.O: `1` sequence, `2` structural,
    /// `0` neither.
    pub fn code(self) -> u8 {
        match self {
            Judgment::Sequence => 1,
            Judgment::Structural => 2,
            Judgment::Neither => 0,
        }
    }
}

/// `true` if the minimum index gap within the sorted structured-residue
/// list `s` between any residue of `a` and any residue of `b` is at most
/// [`SEQ_CONNECTIVITY_MAX_GAP`].
pub fn sequence_connected(a: &ResSet, b: &ResSet, structured_sorted: &[u32]) -> bool {
    let index_of: std::collections::HashMap<u32, usize> = structured_sorted
        .iter()
        .enumerate()
        .map(|(i, &r)| (r, i))
        .collect();
    let mut best = usize::MAX;
    for ra in a.iter() {
        let Some(&ia) = index_of.get(&ra) else { continue };
        for rb in b.iter() {
            let Some(&ib) = index_of.get(&rb) else { continue };
            let gap = ia.abs_diff(ib);
            if gap < best {
                best = gap;
            }
        }
    }
    best <= SEQ_CONNECTIVITY_MAX_GAP
}

/// `true` if at least [`STRUCT_CONNECTIVITY_MIN_PAIRS`] residue pairs
/// `(a, b)` have minimum inter-atomic distance at most
/// [`STRUCT_CONNECTIVITY_DIST_A`] Angstrom.
pub fn structurally_connected(a: &ResSet, b: &ResSet, structure: &Structure) -> bool {
    let mut count = 0usize;
    for ra in a.iter() {
        for rb in b.iter() {
            if let Some(d) = structure.min_atom_distance(ra, rb) {
                if d <= STRUCT_CONNECTIVITY_DIST_A {
                    count += 1;
                    if count >= STRUCT_CONNECTIVITY_MIN_PAIRS {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Full judgment: sequence connectivity is checked first (spec.md §4.O
/// lists it first and the `1`/`2`/`0` codes preserve that precedence).
pub fn judge(a: &ResSet, b: &ResSet, structured_sorted: &[u32], structure: &Structure) -> Judgment {
    if sequence_connected(a, b, structured_sorted) {
        Judgment::Sequence
    } else if structurally_connected(a, b, structure) {
        Judgment::Structural
    } else {
        Judgment::Neither
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resid::ResSet;

    #[test]
    fn sequence_connected_within_gap() {
        let s: Vec<u32> = (1..=20).collect();
        let a = ResSet::parse("1-5").unwrap();
        let b = ResSet::parse("9-12").unwrap();
        assert!(sequence_connected(&a, &b, &s));
        let c = ResSet::parse("20-20").unwrap();
        assert!(!sequence_connected(&a, &c, &s));
    }
}
