//! Stage 16 CLASSIFY (spec.md §4.L): run stage 15's feature rows through the
//! fixed feed-forward classifier, producing one probability per (domain,
//! template) pair.

use crate::classifier::Classifier;
use crate::error::StageError;
use crate::pipeline::ChainContext;
use crate::stages::records::PredictionRow;

use super::{join_rows, write_stage_file};

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let classifier = Classifier::from_checkpoint(&ctx.reference.checkpoint)?;

    let predictions: Vec<PredictionRow> = ctx
        .features
        .iter()
        .map(|features| PredictionRow {
            features: features.clone(),
            classifier_prob: classifier.predict(&features.as_array()),
        })
        .collect();

    let rows: Vec<String> = predictions
        .iter()
        .map(|p| format!("{}\t{:.4}", p.features.to_row(), p.classifier_prob))
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step16_predictions", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.predictions = predictions;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdata::*;
    use crate::refdata::checkpoint::LayerWeights;
    use crate::stages::records::FeatureRow;
    use std::sync::Arc;

    fn feature_row() -> FeatureRow {
        FeatureRow {
            domain_id: "D1".into(),
            domain_range: "1-50".into(),
            t_group: "1.1".into(),
            h_group: "1".into(),
            template_id: "t1".into(),
            short_id: "t1".into(),
            domain_length: 50.0,
            helix_count: 2.0,
            strand_count: 1.0,
            hh_prob: 90.0,
            hh_cov: 0.8,
            hh_rank: 0.1,
            d_z: 1.2,
            d_q: 0.5,
            d_ztile: 0.2,
            d_qtile: 0.2,
            d_rank: 0.3,
            c_diff: 1.0,
            c_cov: 0.9,
            hh_query_range: None,
            hh_template_range: None,
            dali_query_range: None,
            dali_template_range: None,
        }
    }

    fn zero_checkpoint() -> CheckpointFile {
        CheckpointFile {
            dense: LayerWeights {
                kernel: vec![vec![0.0f32; 64]; crate::classifier::NUM_FEATURES],
                bias: vec![0.0; 64],
            },
            dense_1: LayerWeights {
                kernel: vec![vec![0.0f32; 2]; 64],
                bias: vec![0.0; 2],
            },
        }
    }

    #[test]
    fn produces_one_prediction_per_feature_row() {
        let dir = tempfile::tempdir().unwrap();
        let reference = Arc::new(ReferenceData {
            hierarchy: EcodHierarchy::parse(std::io::Cursor::new("")).unwrap(),
            lengths: TemplateLengths::parse(std::io::Cursor::new("")).unwrap(),
            weights: TemplateWeights::new("/tmp"),
            histories: TemplateHistories::new("/tmp"),
            checkpoint: zero_checkpoint(),
        });
        let mut ctx = ChainContext::new("P", dir.into_path(), reference);
        ctx.features = vec![feature_row(), feature_row()];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.predictions.len(), 2);
        // All-zero weights -> equal logits -> 0.5 regardless of input.
        assert!((ctx.predictions[0].classifier_prob - 0.5).abs() < 1e-6);
    }
}
