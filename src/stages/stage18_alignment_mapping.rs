//! Stage 18 ALIGNMENT_MAPPING (spec.md §4.N): for each confident
//! (domain, template) pair, find the hit that matches the template and
//! strictly overlaps the domain, then restrict its query/template ranges to
//! residues actually in the domain.

use std::collections::HashMap;

use crate::error::StageError;
use crate::pipeline::ChainContext;
use crate::resid::overlap_strict;
use crate::stages::records::{EvidenceSource, GoodHit, MappingRow};

use super::{join_rows, write_stage_file};

/// Restrict a hit's query/template ranges to the domain, by position: only
/// alignment columns whose query residue falls in `domain` survive, on
/// both sides of the pairing.
fn restrict_to_domain(hit: &GoodHit, domain: &crate::resid::ResSet) -> (crate::resid::ResSet, crate::resid::ResSet) {
    let mut q = crate::resid::ResSet::new();
    let mut t = crate::resid::ResSet::new();
    for (&qr, &tr) in hit.query_resids.iter().zip(hit.template_resids.iter()) {
        if domain.contains(qr) {
            q.insert(qr);
            t.insert(tr);
        }
    }
    (q, t)
}

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    let domains: HashMap<&str, &crate::resid::ResSet> =
        ctx.domains.iter().map(|d| (d.id.as_str(), &d.resids)).collect();

    let mut mappings = Vec::new();
    for confident in &ctx.confident {
        let Some(&domain_resids) = domains.get(confident.domain_id.as_str()) else {
            continue;
        };

        let mut hh_query = None;
        let mut hh_template = None;
        let mut dali_query = None;
        let mut dali_template = None;

        for hit in &ctx.good_hits {
            if hit.template_uid != confident.template_id {
                continue;
            }
            if !overlap_strict(&hit.query_range, domain_resids) {
                continue;
            }
            let (q, t) = restrict_to_domain(hit, domain_resids);
            match hit.source {
                EvidenceSource::Sequence => {
                    hh_query = Some(q);
                    hh_template = Some(t);
                }
                EvidenceSource::Structural => {
                    dali_query = Some(q);
                    dali_template = Some(t);
                }
            }
        }

        mappings.push(MappingRow {
            domain_id: confident.domain_id.clone(),
            template_id: confident.template_id.clone(),
            hh_query_range: hh_query,
            hh_template_range: hh_template,
            dali_query_range: dali_query,
            dali_template_range: dali_template,
        });
    }

    let rows: Vec<String> = mappings.iter().map(MappingRow::to_row).collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step18_mappings", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.mappings = mappings;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::refdata::*;
    use crate::resid::ResSet;
    use crate::stages::records::ConfidentPrediction;
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

    #[test]
    fn restricts_ranges_to_domain_and_fills_na_for_missing_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ChainContext::new("P", dir.into_path(), empty_reference());
        ctx.domains = vec![Domain::new("D1", ResSet::parse("1-10").unwrap())];
        ctx.confident = vec![ConfidentPrediction {
            domain_id: "D1".into(),
            domain_range: "1-10".into(),
            template_id: "t1".into(),
            t_group: "1.1".into(),
            h_group: "1".into(),
            short_id: "t1".into(),
            classifier_prob: 0.9,
            quality: crate::domain::Quality::Good,
            hh_prob: 90.0,
            hh_cov: 0.9,
        }];
        ctx.good_hits = vec![GoodHit {
            source: EvidenceSource::Sequence,
            template_uid: "t1".into(),
            short_id: "t1".into(),
            t_group: "1.1".into(),
            h_group: "1".into(),
            score: 90.0,
            coverage: 1.0,
            template_length: 20,
            q_score: -1.0,
            z_tile: -1.0,
            q_tile: -1.0,
            rank: 1.0,
            query_range: ResSet::from_ids(1..=20),
            template_range: ResSet::from_ids(1..=20),
            query_resids: (1..=20).collect(),
            template_resids: (1..=20).collect(),
        }];
        run(&mut ctx).unwrap();
        assert_eq!(ctx.mappings.len(), 1);
        let m = &ctx.mappings[0];
        assert_eq!(m.hh_query_range.as_ref().unwrap().format(), "1-10");
        assert!(m.dali_query_range.is_none());
    }
}
