//! Hit data model, SSE assignments and disorder sets (spec.md §3, §9).
//!
//! The source system represents hits as dicts with heterogeneous,
//! channel-dependent fields. Here a hit is a tagged variant with a shared
//! trait for the fields every stage needs regardless of channel
//! (`query_resids`, `template_resids`, a comparable score), plus
//! channel-specific accessors for sequence- or structure-only fields.

use crate::resid::ResId;
use crate::resid::ResSet;

/// Canonical 9-digit ECOD template token, e.g. `"000000123"`.
pub type TemplateId = String;

/// A single sequence-profile (HHsearch-style) hit.
#[derive(Debug, Clone)]
pub struct SequenceHit {
    pub template_id: TemplateId,
    /// `0..=100`.
    pub probability: f64,
    pub query_resids: Vec<ResId>,
    pub template_resids: Vec<ResId>,
    pub template_length: Option<usize>,
}

/// A single structural (fast-structure-search or iterative alignment) hit.
#[derive(Debug, Clone)]
pub struct StructuralHit {
    pub template_id: TemplateId,
    pub z_score: f64,
    pub query_resids: Vec<ResId>,
    pub template_resids: Vec<ResId>,
    pub template_length: Option<usize>,
}

/// Either evidence channel. Downstream stages mostly work through the
/// [`HitEvidence`] trait rather than matching on this directly.
#[derive(Debug, Clone)]
pub enum Hit {
    Sequence(SequenceHit),
    Structural(StructuralHit),
}

/// Shared surface both hit channels expose.
///
/// This is the Rust encoding of spec.md §9's "tagged variant with a shared
/// trait" redesign note for the source's dict-of-fields hit records.
pub trait HitEvidence {
    fn template_id(&self) -> &str;
    fn query_resids(&self) -> &[ResId];
    fn template_resids(&self) -> &[ResId];
    fn template_length(&self) -> Option<usize>;

    /// Channel-comparable score: sequence probability or structural z-score.
    /// Not comparable *across* channels — callers that need a cross-channel
    /// rank use stage-specific normalization (e.g. stage 15's `d_z / 10`).
    fn score(&self) -> f64;

    fn coverage(&self) -> Option<f64> {
        self.template_length()
            .filter(|&len| len > 0)
            .map(|len| self.query_resids().len() as f64 / len as f64)
    }

    fn query_resset(&self) -> ResSet {
        ResSet::from_ids(self.query_resids().iter().copied())
    }

    fn template_resset(&self) -> ResSet {
        ResSet::from_ids(self.template_resids().iter().copied())
    }

    /// Minimum alignment length below which spec.md §4.C drops the hit
    /// entirely (never constructed with fewer than 10 paired residues by
    /// the parsers in [`crate::parsers`]).
    fn paired_len(&self) -> usize {
        self.query_resids().len()
    }
}

impl HitEvidence for SequenceHit {
    fn template_id(&self) -> &str {
        &self.template_id
    }
    fn query_resids(&self) -> &[ResId] {
        &self.query_resids
    }
    fn template_resids(&self) -> &[ResId] {
        &self.template_resids
    }
    fn template_length(&self) -> Option<usize> {
        self.template_length
    }
    fn score(&self) -> f64 {
        self.probability
    }
}

impl HitEvidence for StructuralHit {
    fn template_id(&self) -> &str {
        &self.template_id
    }
    fn query_resids(&self) -> &[ResId] {
        &self.query_resids
    }
    fn template_resids(&self) -> &[ResId] {
        &self.template_resids
    }
    fn template_length(&self) -> Option<usize> {
        self.template_length
    }
    fn score(&self) -> f64 {
        self.z_score
    }
}

impl HitEvidence for Hit {
    fn template_id(&self) -> &str {
        match self {
            Hit::Sequence(h) => h.template_id(),
            Hit::Structural(h) => h.template_id(),
        }
    }
    fn query_resids(&self) -> &[ResId] {
        match self {
            Hit::Sequence(h) => h.query_resids(),
            Hit::Structural(h) => h.query_resids(),
        }
    }
    fn template_resids(&self) -> &[ResId] {
        match self {
            Hit::Sequence(h) => h.template_resids(),
            Hit::Structural(h) => h.template_resids(),
        }
    }
    fn template_length(&self) -> Option<usize> {
        match self {
            Hit::Sequence(h) => h.template_length(),
            Hit::Structural(h) => h.template_length(),
        }
    }
    fn score(&self) -> f64 {
        match self {
            Hit::Sequence(h) => h.score(),
            Hit::Structural(h) => h.score(),
        }
    }
}

/// Secondary-structure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseType {
    Helix,
    Strand,
    Coil,
}

/// Per-residue SSE assignment (stage 11).
#[derive(Debug, Clone, Copy)]
pub struct SseAssignment {
    pub sse_id: Option<u32>,
    pub sse_type: SseType,
}

/// Minimum run length to count as a helix (spec.md §3).
pub const MIN_HELIX_LEN: usize = 6;
/// Minimum run length to count as a strand (spec.md §3).
pub const MIN_STRAND_LEN: usize = 3;

/// Count distinct helix and strand elements across a per-residue SSE type
/// sequence, applying the minimum-run-length rule (spec.md §3). Returns
/// `(helix_count, strand_count)`.
pub fn count_sse_elements(types: &[SseType]) -> (usize, usize) {
    let mut helices = 0;
    let mut strands = 0;
    let mut i = 0;
    while i < types.len() {
        let t = types[i];
        let mut j = i;
        while j < types.len() && types[j] == t {
            j += 1;
        }
        let run_len = j - i;
        match t {
            SseType::Helix if run_len >= MIN_HELIX_LEN => helices += 1,
            SseType::Strand if run_len >= MIN_STRAND_LEN => strands += 1,
            _ => {}
        }
        i = j;
    }
    (helices, strands)
}

/// Count distinct helix/strand elements a domain touches (spec.md §4.K,
/// §4.P stage 24 "recount SSEs inside each domain"). Uses each residue's
/// `sse_id` — already only populated for runs that cleared the
/// minimum-length bar in stage 11 — rather than re-deriving run lengths
/// over a possibly-discontiguous domain, so an element the domain only
/// partially owns still counts once.
pub fn count_domain_sse_elements(domain: &ResSet, full_chain_sse: &[SseAssignment]) -> (usize, usize) {
    let mut helix_ids: std::collections::HashSet<u32> = std::collections::HashSet::new();
    let mut strand_ids: std::collections::HashSet<u32> = std::collections::HashSet::new();
    for resid in domain.iter() {
        let Some(assignment) = full_chain_sse.get(resid as usize - 1) else {
            continue;
        };
        let Some(id) = assignment.sse_id else { continue };
        match assignment.sse_type {
            SseType::Helix => {
                helix_ids.insert(id);
            }
            SseType::Strand => {
                strand_ids.insert(id);
            }
            SseType::Coil => {}
        }
    }
    (helix_ids.len(), strand_ids.len())
}
