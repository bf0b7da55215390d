//! Domain and domain-assignment types (spec.md §3).

use crate::resid::ResSet;

/// A structural domain produced by stage 13. Invariant: every domain is a
/// subset of the structured residues, and domains are pairwise near-disjoint
/// after stage 13 (spec.md §4.J).
#[derive(Debug, Clone)]
pub struct Domain {
    /// `"D1"`, `"D2"`, ... numbered by sequence position of the first
    /// residue (spec.md §4.J step 11).
    pub id: String,
    pub resids: ResSet,
}

impl Domain {
    pub fn new(id: impl Into<String>, resids: ResSet) -> Self {
        Self { id: id.into(), resids }
    }

    pub fn range(&self) -> String {
        self.resids.format()
    }

    pub fn len(&self) -> usize {
        self.resids.size()
    }

    pub fn is_empty(&self) -> bool {
        self.resids.is_empty()
    }
}

/// Quality label assigned at stage 17.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Ok,
    Bad,
}

/// Coverage classification assigned at stage 23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Full,
    Part,
    Miss,
}

/// Final per-domain label assigned at stage 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalLabel {
    GoodDomain,
    PartialDomain,
    LowConfidence,
    SimpleTopology,
}

/// ECOD assignment produced by stages 15-24 for one (domain, template) pair
/// that survived the full pipeline.
#[derive(Debug, Clone)]
pub struct DomainAssignment {
    pub domain_ref: String,
    pub range: String,
    pub template_id: String,
    /// e.g. `"2002.1"`.
    pub t_group: String,
    /// Prefix of `t_group`, e.g. `"2002"` becomes h-group key via
    /// [`crate::refdata::hierarchy::h_group_of`].
    pub h_group: String,
    pub short_ecod_key: String,
    pub classifier_prob: f64,
    pub quality: Quality,
    pub classification: Classification,
    pub final_label: FinalLabel,
    pub weighted_coverage: f64,
    pub length_coverage: f64,
}
