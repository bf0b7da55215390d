//! Fixed pipeline constants (spec.md §4, various stages).
//!
//! These are *not* exposed through [`super::PipelineConfig`] — spec.md §9
//! and §10.3 treat them as part of the specification itself, to be
//! reproduced verbatim rather than tuned per deployment.

/// Minimum paired residues for a parsed hit to survive (spec.md §4.C, §4.F).
pub const MIN_ALIGNED_RESIDUES: usize = 10;

/// Stage 7: loop stops once an alignment produces fewer pairs than this.
pub const STAGE7_MIN_PAIRS: usize = 20;

/// Stage 7: loop also stops once fewer than this many residues remain.
pub const STAGE7_MIN_REMAINING: usize = 20;

/// Stage 13 step 6: segment-pair affinity threshold to consider clustering.
pub const AFFINITY_THRESHOLD: f64 = 0.54;

/// Stage 13 merge test inflation factor on `inter` vs `intra`.
pub const MERGE_INFLATION_FACTOR: f64 = 1.07;

/// Stage 13 merge test: bypass the inflation rule if the smaller side has
/// fewer than this many residue-pairs.
pub const MERGE_SMALL_SIDE_PAIRS: usize = 20;

/// Stage 13 step 8: gaps of at most this many residues are absorbed.
pub const GAP_FILL_MAX: u32 = 10;

/// Stage 13 step 9: minimum length of a retained segment after overlap
/// splitting.
pub const MIN_RETAINED_SEGMENT_LEN: usize = 15;

/// Stage 13 step 9: drop a domain if total retained residues fall below this.
pub const MIN_DOMAIN_RETAINED_TOTAL: usize = 20;

/// Stage 13 step 10: final minimum domain length.
pub const MIN_DOMAIN_LEN_FINAL: usize = 25;

/// Stage 13 step 5: window width for initial segments.
pub const SEGMENT_WINDOW: usize = 5;

/// Stage 13 step 5: minimum ordered residues retained in a window.
pub const SEGMENT_MIN_ORDERED: usize = 3;

/// Stage 13 step 6: segment-pair affinity excludes residue pairs closer than
/// this in sequence (mandatory per spec.md §4.J step 6).
pub const AFFINITY_SEQ_ADJACENCY_FILTER: u32 = 5;

/// Stage 17: t-groups below this classifier probability are dropped.
pub const CONFIDENCE_TGROUP_THRESHOLD: f64 = 0.60;

/// Stage 17: "similar" t-groups are within this of the best probability.
pub const CONFIDENCE_SIMILAR_DELTA: f64 = 0.05;

/// Stage 19: a domain's predictions are retained if within this of its best.
pub const MERGE_CANDIDATE_PROB_DELTA: f64 = 0.1;

/// Stage 19: the two domains' template regions must overlap by less than
/// this fraction (each side) to be merge candidates.
pub const MERGE_CANDIDATE_MAX_OVERLAP: f64 = 0.25;

/// Stage 21: sequence connectivity index gap.
pub const SEQ_CONNECTIVITY_MAX_GAP: usize = 5;

/// Stage 21: structural connectivity distance threshold (Angstrom).
pub const STRUCT_CONNECTIVITY_DIST_A: f64 = 8.0;

/// Stage 21: minimum qualifying residue pairs for structural connectivity.
pub const STRUCT_CONNECTIVITY_MIN_PAIRS: usize = 9;

/// Stage 23: classifier probability floor for `full`/`part`.
pub const CLASSIFY_PROB_FLOOR: f64 = 0.85;

/// Stage 23: weighted-coverage floor for `full`.
pub const CLASSIFY_WCOV_FULL: f64 = 0.66;

/// Stage 23/24: length-coverage floor used by both `full` and `part`.
pub const CLASSIFY_LCOV_FLOOR: f64 = 0.33;

/// Stage 24: SSE count below which a domain is "simple topology" territory.
pub const SSE_COUNT_SIMPLE_THRESHOLD: usize = 3;

/// Stage 24: high-confidence rescue thresholds for SSE-sparse domains.
pub const RESCUE_HH_PROB: f64 = 0.95;
pub const RESCUE_WCOV: f64 = 0.8;
pub const RESCUE_LCOV: f64 = 0.8;

/// Default default-value for HHscore when no covering sequence hit exists
/// (spec.md §4.J step 2).
pub const HHSCORE_DEFAULT: f64 = 20.0;
/// Default DALIscore when no covering structural hit exists.
pub const DALISCORE_DEFAULT: f64 = 1.0;

/// Stage 13 probability combination exponents (spec.md §4.J step 4).
pub const P_DIST_WEIGHT: f64 = 0.1;
pub const P_PAE_WEIGHT: f64 = 0.1;
pub const P_HH_WEIGHT: f64 = 0.4;
pub const P_DALI_WEIGHT: f64 = 0.4;

/// Stage 12: pLDDT floor below which a residue is disorder-eligible.
pub const DISORDER_PLDDT_THRESHOLD: f64 = 50.0;

/// Stage 12: residues within this many positions of `i` (inclusive) form the
/// local window checked for pair-confidence uncertainty.
pub const DISORDER_PAE_WINDOW: u32 = 5;

/// Stage 12: mean PAE within the local window above this marks "high
/// pair-confidence uncertainty".
pub const DISORDER_PAE_THRESHOLD: f32 = 15.0;

/// Stage 15: `hh_rank`/`d_rank` substituted when that evidence channel has
/// no best hit to a template for a domain (spec.md §4.K "defaults"). Named
/// `maxRank` in spec.md prose; `10.0` matches the normalized worst-case
/// value the same feature takes after the `/10` normalization (spec.md
/// §4.K "Normalization critical").
pub const FEATURE_MAX_RANK: f64 = 10.0;

/// Stage 15: `d_ztile`/`d_qtile` substituted when the structural channel
/// has no best hit to a template for a domain (spec.md §4.K "defaults").
pub const FEATURE_ABSENT_TILE: f64 = 10.0;

/// Stage 13: CA-CA distance substituted when either residue lacks a CA atom
/// (design decision, DESIGN.md) — far enough that `p_dist` floors out.
pub const PARTITION_DIST_FALLBACK: f64 = 1000.0;

/// Stage 13: PAE substituted when the chain has no pair-confidence matrix
/// (design decision, DESIGN.md) — high enough that `p_pae` floors out.
pub const PARTITION_PAE_FALLBACK: f32 = 100.0;

/// Default worker pool size for stage 7 if not overridden by
/// [`super::PipelineConfig`].
pub const DEFAULT_STAGE7_WORKERS: usize = 8;

/// `serde(default = ...)` helper for [`super::PipelineConfig::stage7_workers`].
pub fn default_stage7_workers() -> usize {
    DEFAULT_STAGE7_WORKERS
}
