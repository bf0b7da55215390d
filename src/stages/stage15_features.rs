//! Stage 15 FEATURES (spec.md §4.K): for each domain, the best sequence and
//! structural hit per template (among hits overlapping the domain by the
//! permissive rule), turned into the classifier's 13 numerical inputs.
//!
//! Design decision (DESIGN.md): spec.md states `hh_rank`'s formula as a
//! domain-wide mean over `D`'s residues (not the covering hit's own
//! aligned positions, which is what stage 8's `rank` column already means)
//! but gates it — like `hh_prob`/`hh_cov` — on whether a sequence hit to
//! this particular template exists for this domain. This implementation
//! computes the domain-wide ambiguity mean once per domain and reuses it
//! for every template row where the sequence channel is present,
//! substituting [`FEATURE_MAX_RANK`] only when it's absent. `d_rank`
//! reuses stage 8's already-computed [`crate::stages::records::GoodHit::rank`]
//! for the best structural hit, divided by 10 per spec.md's "normalization
//! critical" note.

use std::collections::{HashMap, HashSet};

use crate::config::defaults::{FEATURE_ABSENT_TILE, FEATURE_MAX_RANK};
use crate::error::StageError;
use crate::hits::count_domain_sse_elements;
use crate::pipeline::ChainContext;
use crate::resid::{overlap_permissive, ResId};
use crate::stages::records::{EvidenceSource, FeatureRow, GoodHit};

use super::{join_rows, write_stage_file};

/// Query-residue -> template-residue map from a hit's parallel alignment
/// arrays, used by the consensus features.
fn position_map(hit: &GoodHit) -> HashMap<ResId, ResId> {
    hit.query_resids
        .iter()
        .zip(hit.template_resids.iter())
        .map(|(&q, &t)| (q, t))
        .collect()
}

pub fn run(ctx: &mut ChainContext) -> Result<(), StageError> {
    // Domain-wide ambiguity map, built once from every hit in the chain
    // (spec.md §4.K hh_rank: "|{h_groups of hits covering q}|").
    let mut pos_groups: HashMap<ResId, HashSet<String>> = HashMap::new();
    for hit in &ctx.good_hits {
        for &q in &hit.query_resids {
            pos_groups.entry(q).or_default().insert(hit.h_group.clone());
        }
    }

    let mut features = Vec::new();
    for domain in ctx.domains.clone() {
        let overlapping: Vec<&GoodHit> = ctx
            .good_hits
            .iter()
            .filter(|h| overlap_permissive(&h.query_range, &domain.resids))
            .collect();

        let mut best_seq: HashMap<String, &GoodHit> = HashMap::new();
        let mut best_struct: HashMap<String, &GoodHit> = HashMap::new();
        for hit in &overlapping {
            let table = match hit.source {
                EvidenceSource::Sequence => &mut best_seq,
                EvidenceSource::Structural => &mut best_struct,
            };
            table
                .entry(hit.template_uid.clone())
                .and_modify(|existing| {
                    if hit.score > existing.score {
                        *existing = hit;
                    }
                })
                .or_insert(hit);
        }

        let mut templates: Vec<String> = best_seq.keys().chain(best_struct.keys()).cloned().collect();
        templates.sort_unstable();
        templates.dedup();

        let hh_rank_value = {
            let members: Vec<ResId> = domain.resids.iter().collect();
            if members.is_empty() {
                0.0
            } else {
                let sum: usize = members
                    .iter()
                    .map(|q| pos_groups.get(q).map_or(0, HashSet::len))
                    .sum();
                (sum as f64 / members.len() as f64) / 10.0
            }
        };

        let (helix_count, strand_count) = count_domain_sse_elements(&domain.resids, &ctx.sse);

        for template_id in templates {
            let seq_hit = best_seq.get(&template_id).copied();
            let struct_hit = best_struct.get(&template_id).copied();

            let (hh_prob, hh_cov, hh_rank) = match seq_hit {
                Some(h) => (h.score, h.coverage, hh_rank_value),
                None => (0.0, 0.0, FEATURE_MAX_RANK),
            };
            let (d_z, d_q, d_ztile, d_qtile, d_rank) = match struct_hit {
                Some(h) => (h.score / 10.0, h.q_score, h.z_tile, h.q_tile, h.rank / 10.0),
                None => (0.0, 0.0, FEATURE_ABSENT_TILE, FEATURE_ABSENT_TILE, FEATURE_MAX_RANK),
            };

            let (c_diff, c_cov) = match (seq_hit, struct_hit) {
                (Some(sh), Some(dh)) => {
                    let seq_map = position_map(sh);
                    let dali_map = position_map(dh);
                    let intersection: Vec<ResId> = domain
                        .resids
                        .iter()
                        .filter(|q| seq_map.contains_key(q) && dali_map.contains_key(q))
                        .collect();
                    if intersection.is_empty() {
                        (-1.0, 0.0)
                    } else {
                        let sum: f64 = intersection
                            .iter()
                            .map(|q| (seq_map[q] as f64 - dali_map[q] as f64).abs())
                            .sum();
                        let c_diff = sum / intersection.len() as f64;
                        let c_cov = intersection.len() as f64 / domain.resids.size() as f64;
                        (c_diff, c_cov)
                    }
                }
                _ => (-1.0, 0.0),
            };

            let (t_group, h_group, short_id) = seq_hit
                .or(struct_hit)
                .map(|h| (h.t_group.clone(), h.h_group.clone(), h.short_id.clone()))
                .unwrap_or_default();

            features.push(FeatureRow {
                domain_id: domain.id.clone(),
                domain_range: domain.range(),
                t_group,
                h_group,
                template_id,
                short_id,
                domain_length: domain.len() as f64,
                helix_count: helix_count as f64,
                strand_count: strand_count as f64,
                hh_prob,
                hh_cov,
                hh_rank,
                d_z,
                d_q,
                d_ztile,
                d_qtile,
                d_rank,
                c_diff,
                c_cov,
                hh_query_range: seq_hit.map(|h| h.query_range.clone()),
                hh_template_range: seq_hit.map(|h| h.template_range.clone()),
                dali_query_range: struct_hit.map(|h| h.query_range.clone()),
                dali_template_range: struct_hit.map(|h| h.template_range.clone()),
            });
        }
    }

    let rows: Vec<String> = features.iter().map(FeatureRow::to_row).collect();
    write_stage_file(
        &ctx.work_dir,
        &format!("{}.step15_features", ctx.chain_id),
        &join_rows(rows),
    )?;
    ctx.features = features;
    Ok(())
}
