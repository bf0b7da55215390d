//! Stage 24 FINAL_LABELS (spec.md §4.P): recount SSEs inside each merged
//! domain, assign the final label from the input classification / SSE-count
//! / rescue-threshold table, and renumber domains by mean residue index as
//! `nD1, nD2, ...`.

use crate::config::defaults::{
    RESCUE_HH_PROB, RESCUE_LCOV, RESCUE_WCOV, SSE_COUNT_SIMPLE_THRESHOLD,
};
use crate::domain::{Classification, DomainAssignment, FinalLabel};
use crate::error::StageError;
use crate::hits::count_domain_sse_elements;
use crate::pipeline::ChainContext;
use crate::stages::records::Stage23Prediction;

use super::{join_rows, write_stage_file};

fn assign_label(prediction: &Stage23Prediction, sse_count: usize) -> FinalLabel {
    let simple = sse_count < SSE_COUNT_SIMPLE_THRESHOLD;
    match (prediction.classification, simple) {
        (Classification::Miss, false) => FinalLabel::LowConfidence,
        (Classification::Miss, true) => FinalLabel::SimpleTopology,
        (Classification::Full, false) => FinalLabel::GoodDomain,
        (Classification::Part, false) => FinalLabel::PartialDomain,
        (Classification::Full | Classification::Part, true) => {
            let rescued = prediction.hh_prob >= RESCUE_HH_PROB
                && prediction.weighted_coverage >= RESCUE_WCOV
                && prediction.length_coverage >= RESCUE_LCOV;
            if rescued {
                match prediction.classification {
                    Classification::Full => FinalLabel::GoodDomain,
                    _ => FinalLabel::PartialDomain,
                }
            } else {
                FinalLabel::SimpleTopology
            }
        }
    }
}

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut labeled: Vec<(Stage23Prediction, FinalLabel)> = ctx
        .stage23_predictions
        .iter()
        .cloned()
        .map(|prediction| {
            let (helix, strand) = count_domain_sse_elements(&prediction.resids, &ctx.sse);
            let label = assign_label(&prediction, helix + strand);
            (prediction, label)
        })
        .collect();

    labeled.sort_by(|(a, _), (b, _)| {
        a.resids
            .mean_index()
            .partial_cmp(&b.resids.mean_index())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.domain_id.cmp(&b.domain_id))
    });

    let final_domains: Vec<DomainAssignment> = labeled
        .into_iter()
        .enumerate()
        .map(|(i, (prediction, final_label))| DomainAssignment {
            domain_ref: format!("nD{}", i + 1),
            range: prediction.range,
            template_id: prediction.template_id,
            t_group: prediction.t_group,
            h_group: prediction.h_group,
            short_ecod_key: prediction.short_ecod_key,
            classifier_prob: prediction.classifier_prob,
            quality: prediction.quality,
            classification: prediction.classification,
            final_label,
            weighted_coverage: prediction.weighted_coverage,
            length_coverage: prediction.length_coverage,
        })
        .collect();

    let rows: Vec<String> = final_domains
        .iter()
        .map(|d| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{:.4}\t{:?}\t{:?}",
                d.domain_ref, d.range, d.template_id, d.t_group, d.short_ecod_key, d.classifier_prob,
                d.classification, d.final_label,
            )
        })
        .collect();
    let body = join_rows(rows);
    write_stage_file(&ctx.work_dir, &format!("{}.step24_final.domains", ctx.chain_id), &body)?;
    write_stage_file(&ctx.work_dir, &format!("{}.finalDPAM.domains", ctx.chain_id), &body)?;
    ctx.final_domains = final_domains;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quality;
    use crate::hits::{SseAssignment, SseType};
    use crate::refdata::*;
    use crate::resid::ResSet;
    use std::sync::Arc;

    fn empty_reference() -> Arc<ReferenceData> {
        Arc::new(ReferenceData {
            hierarchy: EcodHierarchy::parse(std::io::Cursor::new("")).unwrap(),
            lengths: TemplateLengths::parse(std::io::Cursor::new("")).unwrap(),
            weights: TemplateWeights::new("/tmp"),
            histories: TemplateHistories::new("/tmp"),
            checkpoint: CheckpointFile {
                dense: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
                dense_1: checkpoint::LayerWeights { kernel: vec![], bias: vec![] },
            },
        })
    }

    fn prediction(id: &str, range: &str, classification: Classification) -> Stage23Prediction {
        Stage23Prediction {
            domain_id: id.into(),
            range: range.into(),
            resids: ResSet::parse(range).unwrap(),
            template_id: "t1".into(),
            t_group: "1.1".into(),
            h_group: "1".into(),
            short_ecod_key: "t1".into(),
            classifier_prob: 0.9,
            quality: Quality::Good,
            classification,
            weighted_coverage: 0.7,
            length_coverage: 0.7,
            hh_prob: 90.0,
        }
    }

    #[test]
    fn full_with_enough_sse_is_good_domain() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.sse = vec![
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(2), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(2), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(2), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(3), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(3), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(3), sse_type: SseType::Strand },
        ];
        ctx.stage23_predictions = vec![prediction("M1", "1-12", Classification::Full)];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.final_domains.len(), 1);
        assert_eq!(ctx.final_domains[0].final_label, FinalLabel::GoodDomain);
        assert_eq!(ctx.final_domains[0].domain_ref, "nD1");
    }

    #[test]
    fn full_with_sparse_sse_and_no_rescue_is_simple_topology() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.sse = vec![SseAssignment { sse_id: None, sse_type: SseType::Coil }; 12];
        let mut p = prediction("M1", "1-12", Classification::Full);
        p.hh_prob = 50.0;
        ctx.stage23_predictions = vec![p];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.final_domains[0].final_label, FinalLabel::SimpleTopology);
    }

    #[test]
    fn miss_with_enough_sse_is_low_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.sse = vec![
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(1), sse_type: SseType::Helix },
            SseAssignment { sse_id: Some(2), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(2), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(2), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(3), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(3), sse_type: SseType::Strand },
            SseAssignment { sse_id: Some(3), sse_type: SseType::Strand },
        ];
        ctx.stage23_predictions = vec![prediction("M1", "1-12", Classification::Miss)];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.final_domains[0].final_label, FinalLabel::LowConfidence);
    }
}
