//! Residue identifiers and residue-set range algebra (spec.md §3, §4.A).
//!
//! `ResId` is the 1-based residue numbering used throughout the pipeline,
//! matching the input coordinate file's own numbering. `ResSet` is an
//! unordered collection of residues with a canonical range-string
//! serialization (`"1-50,60-100"`, empty set as `"na"`).

use std::collections::BTreeSet;
use std::fmt;

use crate::error::StageError;

/// 1-based residue identifier, matching the input coordinate numbering.
pub type ResId = u32;

/// A set of residues. Backed by a `BTreeSet` so iteration is always in
/// ascending residue order — every operation in this module that needs a
/// stable order (range formatting, segmentation) gets it for free rather
/// than sorting ad hoc at each call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResSet(BTreeSet<ResId>);

impl ResSet {
    /// Empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Build from an explicit iterator of residue ids (order/dupes don't matter).
    pub fn from_ids<I: IntoIterator<Item = ResId>>(ids: I) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, id: ResId) -> bool {
        self.0.contains(&id)
    }

    pub fn insert(&mut self, id: ResId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: ResId) -> bool {
        self.0.remove(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Ascending iterator over member residues.
    pub fn iter(&self) -> impl Iterator<Item = ResId> + '_ {
        self.0.iter().copied()
    }

    pub fn min(&self) -> Option<ResId> {
        self.0.iter().next().copied()
    }

    pub fn max(&self) -> Option<ResId> {
        self.0.iter().next_back().copied()
    }

    /// Mean residue index, used for domain numbering (spec.md §4.J step 11,
    /// §4.P step 24). `None` for an empty set.
    pub fn mean_index(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        let sum: u64 = self.0.iter().map(|&r| r as u64).sum();
        Some(sum as f64 / self.0.len() as f64)
    }

    pub fn union(&self, other: &ResSet) -> ResSet {
        ResSet(self.0.union(&other.0).copied().collect())
    }

    pub fn intersect(&self, other: &ResSet) -> ResSet {
        ResSet(self.0.intersection(&other.0).copied().collect())
    }

    pub fn difference(&self, other: &ResSet) -> ResSet {
        ResSet(self.0.difference(&other.0).copied().collect())
    }

    /// Parse a canonical range string (`"1-50,60-100"`, or `"na"` for empty).
    ///
    /// Rejects malformed input and non-monotonic / overlapping segments —
    /// spec.md §4.A requires segments to be strictly increasing with `a<=b`
    /// and no overlap, so parsing doubles as validation.
    pub fn parse(s: &str) -> Result<ResSet, StageError> {
        let s = s.trim();
        if s.is_empty() || s == "na" {
            return Ok(ResSet::new());
        }

        let mut set = BTreeSet::new();
        let mut prev_end: Option<ResId> = None;
        for segment in s.split(',') {
            let segment = segment.trim();
            let (a, b) = match segment.split_once('-') {
                Some((a, b)) => (a, b),
                None => {
                    return Err(StageError::ParseError {
                        stage: "resset",
                        detail: format!("segment '{segment}' has no '-'"),
                    })
                }
            };
            let a: ResId = a.parse().map_err(|_| StageError::ParseError {
                stage: "resset",
                detail: format!("bad start residue in '{segment}'"),
            })?;
            let b: ResId = b.parse().map_err(|_| StageError::ParseError {
                stage: "resset",
                detail: format!("bad end residue in '{segment}'"),
            })?;
            if a == 0 || b == 0 {
                return Err(StageError::InvariantViolation(format!(
                    "residue id must be >= 1, got segment '{segment}'"
                )));
            }
            if a > b {
                return Err(StageError::InvariantViolation(format!(
                    "segment '{segment}' is not a<=b"
                )));
            }
            if let Some(prev) = prev_end {
                if a <= prev {
                    return Err(StageError::InvariantViolation(format!(
                        "segments not strictly increasing at '{segment}'"
                    )));
                }
            }
            for r in a..=b {
                set.insert(r);
            }
            prev_end = Some(b);
        }
        Ok(ResSet(set))
    }

    /// Canonical serialization: maximal consecutive runs as `a-b`, comma
    /// separated, empty set as `"na"`.
    pub fn format(&self) -> String {
        if self.0.is_empty() {
            return "na".to_string();
        }
        let mut parts = Vec::new();
        let mut iter = self.0.iter().copied();
        let mut start = iter.next().expect("checked non-empty above");
        let mut end = start;
        for r in iter {
            if r == end + 1 {
                end = r;
            } else {
                parts.push(format!("{start}-{end}"));
                start = r;
                end = r;
            }
        }
        parts.push(format!("{start}-{end}"));
        parts.join(",")
    }

    /// Split into maximal runs where consecutive members differ by at most
    /// `tol` (spec.md §4.A, used by stage 7 with
    /// `tol = max(5, floor(0.05 * |set|))`). Fills small gaps rather than
    /// treating them as breaks — this is what lets stage 7 excise a whole
    /// aligned region even when the alignment itself has a few missing
    /// positions.
    pub fn segments_with_tolerance(&self, tol: u32) -> Vec<ResSet> {
        let members: Vec<ResId> = self.0.iter().copied().collect();
        if members.is_empty() {
            return Vec::new();
        }
        let mut segments = Vec::new();
        let mut current = vec![members[0]];
        for &r in &members[1..] {
            let last = *current.last().expect("current is never empty");
            if r.saturating_sub(last) <= tol {
                current.push(r);
            } else {
                segments.push(ResSet::from_ids(fill_range(&current)));
                current = vec![r];
            }
        }
        segments.push(ResSet::from_ids(fill_range(&current)));
        segments
    }
}

/// Fill every residue between the min and max of a tolerance-joined run —
/// `segments_with_tolerance` is meant to produce contiguous ranges, not just
/// the original sparse members.
fn fill_range(members: &[ResId]) -> Vec<ResId> {
    let lo = *members.first().expect("non-empty run");
    let hi = *members.last().expect("non-empty run");
    (lo..=hi).collect()
}

impl fmt::Display for ResSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Permissive overlap test (spec.md §4.A, used by stage 15): `true` if the
/// intersection is at least half of either side. Empty sets never overlap.
pub fn overlap_permissive(a: &ResSet, b: &ResSet) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let shared = a.intersect(b).size() as f64;
    shared >= 0.5 * a.size() as f64 || shared >= 0.5 * b.size() as f64
}

/// Strict overlap test (spec.md §4.A, used by stage 18): requires the
/// intersection to be at least a third of `a`, *and then* at least half of
/// either side. This is a genuinely stricter gate than
/// [`overlap_permissive`] on the `a` side; `b`-dominant overlaps must still
/// clear the 1/3-of-`a` bar first.
pub fn overlap_strict(a: &ResSet, b: &ResSet) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let shared = a.intersect(b).size() as f64;
    if shared < 0.33 * a.size() as f64 {
        return false;
    }
    shared >= 0.5 * a.size() as f64 || shared >= 0.5 * b.size() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_format_roundtrip() {
        let s = "1-50,60-100";
        let set = ResSet::parse(s).unwrap();
        assert_eq!(set.format(), s);
        assert_eq!(set.size(), 50 + 41);
    }

    #[test]
    fn empty_is_na() {
        let set = ResSet::parse("na").unwrap();
        assert!(set.is_empty());
        assert_eq!(set.format(), "na");
    }

    #[test]
    fn rejects_non_monotonic() {
        assert!(ResSet::parse("10-20,15-25").is_err());
    }

    #[test]
    fn rejects_backwards_segment() {
        assert!(ResSet::parse("20-10").is_err());
    }

    #[test]
    fn rejects_malformed() {
        assert!(ResSet::parse("abc").is_err());
        assert!(ResSet::parse("1-").is_err());
    }

    #[test]
    fn set_algebra() {
        let a = ResSet::parse("1-10").unwrap();
        let b = ResSet::parse("5-15").unwrap();
        assert_eq!(a.union(&b).format(), "1-15");
        assert_eq!(a.intersect(&b).format(), "5-10");
        assert_eq!(a.difference(&b).format(), "1-4");
    }

    #[test]
    fn segments_with_tolerance_joins_small_gaps() {
        let set = ResSet::from_ids(vec![1, 2, 3, 10, 11, 12, 50]);
        let segs = set.segments_with_tolerance(5);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].format(), "1-12");
        assert_eq!(segs[1].format(), "50-50");
    }

    #[test]
    fn overlap_permissive_half_of_either_side() {
        let a = ResSet::parse("1-10").unwrap();
        let b = ResSet::parse("1-4").unwrap();
        assert!(overlap_permissive(&a, &b));
        let c = ResSet::parse("1-2").unwrap();
        assert!(!overlap_permissive(&a, &c));
    }

    #[test]
    fn overlap_permissive_empty_is_false() {
        let a = ResSet::parse("1-10").unwrap();
        let empty = ResSet::new();
        assert!(!overlap_permissive(&a, &empty));
    }

    #[test]
    fn overlap_strict_requires_third_of_a_first() {
        let a = ResSet::parse("1-30").unwrap();
        // 9/30 = 0.3, below the 0.33 floor on `a`.
        let b = ResSet::parse("1-9").unwrap();
        assert!(!overlap_strict(&a, &b));
        // 10/30 clears the floor but still needs >= half of either side.
        let c = ResSet::parse("1-10").unwrap();
        assert!(!overlap_strict(&a, &c));
        let d = ResSet::parse("1-15").unwrap();
        assert!(overlap_strict(&a, &d));
    }
}
