//! Stage registry (spec.md §4.E): stage ids in their fixed execution order,
//! with each stage's declared output-file name for the
//! "output files exist" resume check.
//!
//! Numbering follows spec.md exactly, including the deliberate 13->15 jump
//! (there is no stage 14 in the source specification).

use std::fmt;

/// One of the 24 (23 distinct, no 14) pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageId {
    Prepare = 1,
    Hhsearch = 2,
    Foldseek = 3,
    FilterFoldseek = 4,
    MapEcod = 5,
    DaliCandidates = 6,
    IterativeAlignment = 7,
    GoodHits = 8,
    GetSupport = 9,
    FilterDomains = 10,
    Sse = 11,
    Disorder = 12,
    Partition = 13,
    Features = 15,
    Classifier = 16,
    ConfidenceFilter = 17,
    AlignmentMapping = 18,
    MergeCandidates = 19,
    ExtractDomains = 20,
    CompareDomains = 21,
    MergeDomains = 22,
    ClassifyCoverage = 23,
    FinalLabels = 24,
}

/// Execution order, matching spec.md §2/§4.E exactly (stage 13 -> 15, no 14).
pub const STAGE_ORDER: &[StageId] = &[
    StageId::Prepare,
    StageId::Hhsearch,
    StageId::Foldseek,
    StageId::FilterFoldseek,
    StageId::MapEcod,
    StageId::DaliCandidates,
    StageId::IterativeAlignment,
    StageId::GoodHits,
    StageId::GetSupport,
    StageId::FilterDomains,
    StageId::Sse,
    StageId::Disorder,
    StageId::Partition,
    StageId::Features,
    StageId::Classifier,
    StageId::ConfidenceFilter,
    StageId::AlignmentMapping,
    StageId::MergeCandidates,
    StageId::ExtractDomains,
    StageId::CompareDomains,
    StageId::MergeDomains,
    StageId::ClassifyCoverage,
    StageId::FinalLabels,
];

impl StageId {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Short, stable name used in tracing spans and error messages.
    pub fn name(self) -> &'static str {
        match self {
            StageId::Prepare => "PREPARE",
            StageId::Hhsearch => "HHSEARCH",
            StageId::Foldseek => "FOLDSEEK",
            StageId::FilterFoldseek => "FILTER_FOLDSEEK",
            StageId::MapEcod => "MAP_ECOD",
            StageId::DaliCandidates => "DALI_CANDIDATES",
            StageId::IterativeAlignment => "ITERATIVE_ALIGNMENT",
            StageId::GoodHits => "GOOD_HITS",
            StageId::GetSupport => "GET_SUPPORT",
            StageId::FilterDomains => "FILTER_DOMAINS",
            StageId::Sse => "SSE",
            StageId::Disorder => "DISORDER",
            StageId::Partition => "PARTITION",
            StageId::Features => "FEATURES",
            StageId::Classifier => "CLASSIFIER",
            StageId::ConfidenceFilter => "CONFIDENCE_FILTER",
            StageId::AlignmentMapping => "ALIGNMENT_MAPPING",
            StageId::MergeCandidates => "MERGE_CANDIDATES",
            StageId::ExtractDomains => "EXTRACT_DOMAINS",
            StageId::CompareDomains => "COMPARE_DOMAINS",
            StageId::MergeDomains => "MERGE_DOMAINS",
            StageId::ClassifyCoverage => "CLASSIFY_COVERAGE",
            StageId::FinalLabels => "FINAL_LABELS",
        }
    }

    /// Output files this stage is expected to produce, relative to the
    /// chain's work directory, named per spec.md §6's intermediate-file
    /// table (`P` stands for the chain id). Used only by the resume check
    /// (spec.md §4.E: "all output files exist").
    pub fn output_files(self, chain_id: &str) -> Vec<String> {
        let p = chain_id;
        match self {
            StageId::Prepare => vec![format!("{p}.fa"), format!("{p}.pdb")],
            StageId::Hhsearch => vec![format!("{p}.hhsearch")],
            StageId::Foldseek => vec![format!("{p}.foldseek")],
            StageId::FilterFoldseek => vec![format!("{p}.foldseek.flt.result")],
            StageId::MapEcod => vec![format!("{p}.map2ecod.result")],
            StageId::DaliCandidates => vec![format!("{p}_hits4Dali")],
            StageId::IterativeAlignment => vec![format!("{p}_iterativdDali_hits")],
            StageId::GoodHits => vec![format!("{p}_good_hits")],
            StageId::GetSupport => {
                vec![format!("{p}_sequence.result"), format!("{p}_structure.result")]
            }
            StageId::FilterDomains => vec![format!("{p}.goodDomains")],
            StageId::Sse => vec![format!("{p}.sse")],
            StageId::Disorder => vec![format!("{p}.diso")],
            StageId::Partition => vec![format!("{p}.finalDPAM.domains"), format!("{p}.step13_domains")],
            StageId::Features => vec![format!("{p}.step15_features")],
            StageId::Classifier => vec![format!("{p}.step16_predictions")],
            StageId::ConfidenceFilter => vec![format!("{p}.step17_confident_predictions")],
            StageId::AlignmentMapping => vec![format!("{p}.step18_mappings")],
            StageId::MergeCandidates => vec![format!("{p}.step19_merge_candidates")],
            StageId::ExtractDomains => vec![format!("{p}.step20_extracted")],
            StageId::CompareDomains => vec![format!("{p}.step21_comparisons")],
            StageId::MergeDomains => vec![format!("{p}.step22_merged_domains")],
            StageId::ClassifyCoverage => vec![format!("{p}.step23_predictions")],
            StageId::FinalLabels => {
                vec![format!("{p}.step24_final.domains"), format!("{p}.finalDPAM.domains")]
            }
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_has_no_stage_14() {
        assert!(STAGE_ORDER.iter().all(|s| s.as_u32() != 14));
        assert_eq!(STAGE_ORDER.len(), 23);
    }

    #[test]
    fn stage_order_is_ascending_except_the_13_to_15_jump() {
        let ids: Vec<u32> = STAGE_ORDER.iter().map(|s| s.as_u32()).collect();
        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn output_files_are_named_with_chain_prefix() {
        let files = StageId::Partition.output_files("P");
        assert!(files.iter().any(|f| f == "P.finalDPAM.domains"));
    }
}
