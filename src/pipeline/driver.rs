//! Per-chain checkpointed pipeline driver (spec.md §4.E).
//!
//! Owns every in-memory artifact for one chain ([`ChainContext`]) and walks
//! [`super::registry::STAGE_ORDER`], skipping stages already marked
//! completed when `resume` is set and their output files exist, executing
//! otherwise. A stage failure is recorded and the driver *continues* to the
//! next stage (spec.md §7 error isolation) unless the error is an
//! [`crate::error::StageError::InvariantViolation`], which aborts the chain.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::{Domain, DomainAssignment};
use crate::error::StageError;
use crate::hits::{Hit, SequenceHit, StructuralHit, TemplateId};
use crate::merge::MergeCandidate;
use crate::refdata::ReferenceData;
use crate::resid::ResSet;
use crate::stages::records::{
    ComparisonRow, FeatureRow, GoodHit, MappingRow, MergedDomain, PredictionRow, Stage23Prediction,
    ConfidentPrediction,
};
use crate::structure::Structure;

use super::registry::{StageId, STAGE_ORDER};
use super::state::PipelineState;

/// Pluggable pairwise structural alignment tool (spec.md §1: invocation is
/// out of scope; this crate only owns the iterative loop and parsing around
/// it). Implementations wrap whatever external aligner a deployment uses.
pub trait StructuralAligner: Send + Sync {
    /// Align `working` against `template_id`, returning the alignment
    /// tool's raw text output (parsed by [`crate::parsers::dali`]). A
    /// crashed/unavailable tool should return `Ok(String::new())` — an
    /// empty result is valid zero-pair output, not an error (spec.md §4.G).
    fn align(&self, working: &Structure, template_id: &str, scratch_dir: &std::path::Path) -> Result<String, StageError>;
}

/// Every in-memory artifact accumulated for one chain, owned exclusively by
/// its driver and dropped when the chain finishes (spec.md §3 "Ownership").
pub struct ChainContext {
    pub chain_id: String,
    pub work_dir: PathBuf,
    pub reference: Arc<ReferenceData>,

    /// Raw text the external sequence-profile search tool produced
    /// (spec.md §1: invocation out of scope, supplied by the caller).
    pub hhsearch_raw: Option<String>,
    pub foldseek_raw: Option<String>,
    pub sse_raw: Option<String>,
    pub aligner: Option<Arc<dyn StructuralAligner>>,

    pub structure: Option<Structure>,

    pub sequence_hits: Vec<SequenceHit>,
    pub structural_hits: Vec<StructuralHit>,
    pub foldseek_filtered: Vec<StructuralHit>,
    pub ecod_mapped: Vec<SequenceHit>,
    pub dali_candidates: Vec<TemplateId>,
    pub iterative_hits: Vec<StructuralHit>,
    pub good_hits: Vec<GoodHit>,
    pub support_sequence: Vec<GoodHit>,
    pub support_structure: Vec<GoodHit>,
    pub good_domains: Vec<GoodHit>,
    pub sse: Vec<crate::hits::SseAssignment>,
    pub disorder: ResSet,
    pub domains: Vec<Domain>,
    pub features: Vec<FeatureRow>,
    pub predictions: Vec<PredictionRow>,
    pub confident: Vec<ConfidentPrediction>,
    pub mappings: Vec<MappingRow>,
    pub merge_candidates: Vec<MergeCandidate>,
    pub extracted_domain_pdbs: BTreeMap<String, String>,
    pub comparisons: Vec<ComparisonRow>,
    pub merged_domains: Vec<MergedDomain>,
    pub stage23_predictions: Vec<Stage23Prediction>,
    pub final_domains: Vec<DomainAssignment>,
}

impl ChainContext {
    pub fn new(chain_id: impl Into<String>, work_dir: PathBuf, reference: Arc<ReferenceData>) -> Self {
        Self {
            chain_id: chain_id.into(),
            work_dir,
            reference,
            hhsearch_raw: None,
            foldseek_raw: None,
            sse_raw: None,
            aligner: None,
            structure: None,
            sequence_hits: Vec::new(),
            structural_hits: Vec::new(),
            foldseek_filtered: Vec::new(),
            ecod_mapped: Vec::new(),
            dali_candidates: Vec::new(),
            iterative_hits: Vec::new(),
            good_hits: Vec::new(),
            support_sequence: Vec::new(),
            support_structure: Vec::new(),
            good_domains: Vec::new(),
            sse: Vec::new(),
            disorder: ResSet::new(),
            domains: Vec::new(),
            features: Vec::new(),
            predictions: Vec::new(),
            confident: Vec::new(),
            mappings: Vec::new(),
            merge_candidates: Vec::new(),
            extracted_domain_pdbs: BTreeMap::new(),
            comparisons: Vec::new(),
            merged_domains: Vec::new(),
            stage23_predictions: Vec::new(),
            final_domains: Vec::new(),
        }
    }

    /// All hits from both evidence channels, as the shared [`Hit`] variant
    /// (used by stage 13's per-pair scoring).
    pub fn all_hits(&self) -> Vec<Hit> {
        let mut out: Vec<Hit> = self.ecod_mapped.iter().cloned().map(Hit::Sequence).collect();
        out.extend(self.foldseek_filtered.iter().cloned().map(Hit::Structural));
        out.extend(self.iterative_hits.iter().cloned().map(Hit::Structural));
        out
    }

    pub fn state_path(&self) -> PathBuf {
        self.work_dir.join(format!(".{}.dpam_state.json", self.chain_id))
    }
}

/// Run every stage of [`STAGE_ORDER`] for one chain, honoring resume and
/// error-isolation semantics (spec.md §4.E, §7).
pub fn run_chain(ctx: &mut ChainContext, resume: bool) -> Result<PipelineState, StageError> {
    let state_path = ctx.state_path();
    let mut state = PipelineState::load_or_fresh(&state_path)?;

    for &stage in STAGE_ORDER {
        if resume && state.is_completed(stage) {
            let outputs_exist = stage
                .output_files(&ctx.chain_id)
                .iter()
                .all(|f| ctx.work_dir.join(f).exists());
            if outputs_exist {
                info!(stage = %stage, chain = %ctx.chain_id, "skipping, already completed");
                continue;
            }
            warn!(stage = %stage, chain = %ctx.chain_id, "marked completed but outputs missing, re-running");
        }

        info!(stage = %stage, chain = %ctx.chain_id, "running");
        match execute_stage(stage, ctx) {
            Ok(()) => {
                state.mark_completed(stage);
                info!(stage = %stage, chain = %ctx.chain_id, "completed");
            }
            Err(e) if e.is_fatal() => {
                error!(stage = %stage, chain = %ctx.chain_id, error = %e, "invariant violation, aborting chain");
                state.mark_failed(stage, e.to_string());
                state.persist(&state_path)?;
                return Err(e);
            }
            Err(e) => {
                warn!(stage = %stage, chain = %ctx.chain_id, error = %e, "stage failed, continuing");
                state.mark_failed(stage, e.to_string());
            }
        }
        state.persist(&state_path)?;
    }

    Ok(state)
}

fn execute_stage(stage: StageId, ctx: &mut ChainContext) -> Result<(), StageError> {
    use crate::stages::*;
    match stage {
        StageId::Prepare => stage01_prepare::run(ctx),
        StageId::Hhsearch => stage02_hhsearch::run(ctx),
        StageId::Foldseek => stage03_foldseek::run(ctx),
        StageId::FilterFoldseek => stage04_filter_foldseek::run(ctx),
        StageId::MapEcod => stage05_map_ecod::run(ctx),
        StageId::DaliCandidates => stage06_dali_candidates::run(ctx),
        StageId::IterativeAlignment => stage07_iterative_alignment::run(ctx),
        StageId::GoodHits => stage08_good_hits::run(ctx),
        StageId::GetSupport => stage09_get_support::run(ctx),
        StageId::FilterDomains => stage10_filter_domains::run(ctx),
        StageId::Sse => stage11_sse::run(ctx),
        StageId::Disorder => stage12_disorder::run(ctx),
        StageId::Partition => stage13_partition::run(ctx),
        StageId::Features => stage15_features::run(ctx),
        StageId::Classifier => stage16_classifier::run(ctx),
        StageId::ConfidenceFilter => stage17_confidence_filter::run(ctx),
        StageId::AlignmentMapping => stage18_alignment_mapping::run(ctx),
        StageId::MergeCandidates => stage19_merge_candidates::run(ctx),
        StageId::ExtractDomains => stage20_extract_domains::run(ctx),
        StageId::CompareDomains => stage21_compare_domains::run(ctx),
        StageId::MergeDomains => stage22_merge_domains::run(ctx),
        StageId::ClassifyCoverage => stage23_classify_coverage::run(ctx),
        StageId::FinalLabels => stage24_final_labels::run(ctx),
    }
}
