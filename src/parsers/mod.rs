//! Tool-output parsers (spec.md §4.C).
//!
//! Every parser here is strictly passive: it reads text this crate never
//! produced (the output of an external sequence-profile search, fast
//! structure search, pairwise structural aligner, or secondary-structure
//! assigner — all out of scope per spec.md §1) and turns it into this
//! crate's [`crate::hits::Hit`] / [`crate::hits::SseAssignment`] types. None
//! of these parsers invokes anything; they tolerate header lines and
//! trailing blank lines (spec.md §4.C), and drop any hit with fewer than
//! [`crate::config::defaults::MIN_ALIGNED_RESIDUES`] paired residues.

pub mod dali;
pub mod foldseek;
pub mod hhsearch;
pub mod sse;

use std::sync::OnceLock;

use regex::Regex;

/// Matches a free-text header/banner line with no digit in it at all — the
/// shape of every column-header row these tab-separated formats use (e.g.
/// `template_id\tprobability\t...`), as opposed to a data row, whose first
/// column (a 9-digit template id or a residue id) always contains one.
fn header_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^0-9]*$").expect("static pattern is valid"))
}

/// Shared line-tolerance helper: trims, skips blank lines, `#`-prefixed
/// comment lines, and digit-free header/banner lines (spec.md §4.C: "must
/// tolerate... header lines").
pub(crate) fn significant_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !header_line_pattern().is_match(l))
}

/// Parse a comma-separated list of residue ids in alignment order (as
/// opposed to [`crate::resid::ResSet`]'s range-string form, which loses
/// pairing order). Used by the tab-separated hit record formats in this
/// module.
pub(crate) fn parse_resid_list(
    field: &str,
    stage: &'static str,
) -> Result<Vec<crate::resid::ResId>, crate::error::StageError> {
    field
        .split(',')
        .map(|tok| {
            tok.trim()
                .parse()
                .map_err(|_| crate::error::StageError::ParseError {
                    stage,
                    detail: format!("bad residue id token '{tok}' in '{field}'"),
                })
        })
        .collect()
}
