//! Stage 17 CONFIDENCE_FILTER (spec.md §4.M): per domain, keep the best
//! prediction per t-group, drop t-groups below the probability floor, and
//! label the survivors `good`/`ok`/`bad` by how cleanly one t-group (or at
//! least one h-group) stands out.

use std::collections::HashMap;

use crate::config::defaults::{CONFIDENCE_SIMILAR_DELTA, CONFIDENCE_TGROUP_THRESHOLD};
use crate::domain::Quality;
use crate::error::StageError;
use crate::pipeline::ChainContext;
use crate::stages::records::{ConfidentPrediction, PredictionRow};

use super::{join_rows, write_stage_file};

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let mut by_domain: HashMap<String, Vec<&PredictionRow>> = HashMap::new();
    for p in &ctx.predictions {
        by_domain.entry(p.features.domain_id.clone()).or_default().push(p);
    }

    let mut domain_ids: Vec<&String> = by_domain.keys().collect();
    domain_ids.sort_unstable();

    let mut confident = Vec::new();
    for domain_id in domain_ids {
        let rows = &by_domain[domain_id];

        let mut best_per_tgroup: HashMap<&str, &PredictionRow> = HashMap::new();
        for &row in rows {
            best_per_tgroup
                .entry(row.features.t_group.as_str())
                .and_modify(|existing| {
                    if row.classifier_prob > existing.classifier_prob {
                        *existing = row;
                    }
                })
                .or_insert(row);
        }

        let survivors: Vec<&PredictionRow> = best_per_tgroup
            .into_values()
            .filter(|row| row.classifier_prob >= CONFIDENCE_TGROUP_THRESHOLD)
            .collect();
        if survivors.is_empty() {
            continue;
        }

        let best_prob = survivors
            .iter()
            .map(|r| r.classifier_prob)
            .fold(f64::MIN, f64::max);
        let similar: Vec<&&PredictionRow> = survivors
            .iter()
            .filter(|r| r.classifier_prob >= best_prob - CONFIDENCE_SIMILAR_DELTA)
            .collect();

        let mut similar_h_groups: Vec<&str> = similar.iter().map(|r| r.features.h_group.as_str()).collect();
        similar_h_groups.sort_unstable();
        similar_h_groups.dedup();

        let quality = if similar.len() == 1 {
            Quality::Good
        } else if similar_h_groups.len() == 1 {
            Quality::Ok
        } else {
            Quality::Bad
        };

        let mut sorted_survivors = survivors.clone();
        sorted_survivors.sort_by(|a, b| a.features.t_group.cmp(&b.features.t_group));
        for row in sorted_survivors {
            confident.push(ConfidentPrediction {
                domain_id: row.features.domain_id.clone(),
                domain_range: row.features.domain_range.clone(),
                template_id: row.features.template_id.clone(),
                t_group: row.features.t_group.clone(),
                h_group: row.features.h_group.clone(),
                short_id: row.features.short_id.clone(),
                classifier_prob: row.classifier_prob,
                quality,
                hh_prob: row.features.hh_prob,
                hh_cov: row.features.hh_cov,
            });
        }
    }

    let rows: Vec<String> = confident
        .iter()
        .map(|p| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:?}",
                p.domain_id,
                p.domain_range,
                p.template_id,
                p.t_group,
                p.h_group,
                p.short_id,
                p.classifier_prob,
                p.quality,
            )
        })
        .collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step17_confident_predictions", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.confident = confident;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdata::*;
    use crate::stages::records::FeatureRow;
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

    fn prediction(domain: &str, t_group: &str, h_group: &str, template: &str, prob: f64) -> PredictionRow {
        PredictionRow {
            features: FeatureRow {
                domain_id: domain.into(),
                domain_range: "1-50".into(),
                t_group: t_group.into(),
                h_group: h_group.into(),
                template_id: template.into(),
                short_id: template.into(),
                domain_length: 50.0,
                helix_count: 2.0,
                strand_count: 1.0,
                hh_prob: 80.0,
                hh_cov: 0.8,
                hh_rank: 0.1,
                d_z: 1.0,
                d_q: 0.5,
                d_ztile: 0.2,
                d_qtile: 0.2,
                d_rank: 0.1,
                c_diff: 1.0,
                c_cov: 0.9,
                hh_query_range: None,
                hh_template_range: None,
                dali_query_range: None,
                dali_template_range: None,
            },
            classifier_prob: prob,
        }
    }

    #[test]
    fn single_clear_winner_is_good() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.predictions = vec![
            prediction("D1", "1.1", "1", "t1", 0.95),
            prediction("D1", "2.1", "2", "t2", 0.50),
        ];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.confident.len(), 1);
        assert_eq!(ctx.confident[0].quality, Quality::Good);
    }

    #[test]
    fn two_close_tgroups_same_hgroup_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.predictions = vec![
            prediction("D1", "1.1", "1", "t1", 0.90),
            prediction("D1", "1.2", "1", "t2", 0.89),
        ];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.confident.len(), 2);
        assert!(ctx.confident.iter().all(|p| p.quality == Quality::Ok));
    }

    #[test]
    fn two_close_tgroups_different_hgroup_is_bad() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.predictions = vec![
            prediction("D1", "1.1", "1", "t1", 0.90),
            prediction("D1", "2.1", "2", "t2", 0.89),
        ];
        run(&mut ctx).unwrap();
        assert!(ctx.confident.iter().all(|p| p.quality == Quality::Bad));
    }

    #[test]
    fn below_threshold_domain_has_no_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.predictions = vec![prediction("D1", "1.1", "1", "t1", 0.3)];
        run(&mut ctx).unwrap();
        assert!(ctx.confident.is_empty());
    }
}
