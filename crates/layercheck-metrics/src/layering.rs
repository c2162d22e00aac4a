use std::collections::{BTreeSet, HashMap};

use layercheck_core::metrics_api::{ParityResult, RankDiff, RankDiffKind};
use layercheck_core::model::{Layering, NodeId};

/// Rank-by-rank diff of two layerings of the same node set.
///
/// A rank whose membership differs counts as a composition mismatch and is
/// not scored for order or displacement. Missing ranks on either side read
/// as empty.
pub fn compare_layerings(candidate: &Layering, reference: &Layering) -> ParityResult {
    let max_rank = candidate.len().max(reference.len());
    let mut comparable = 0usize;
    let mut composition_mismatch = 0usize;
    let mut exact = 0usize;
    let mut order_mismatch = 0usize;
    let mut displacement_sum = 0usize;
    let mut displacement_count = 0usize;
    let mut rank_diffs = Vec::new();

    for r in 0..max_rank {
        let cand = candidate.rank(r);
        let refr = reference.rank(r);
        let cand_set: BTreeSet<&str> = cand.iter().map(String::as_str).collect();
        let ref_set: BTreeSet<&str> = refr.iter().map(String::as_str).collect();

        if cand_set != ref_set {
            composition_mismatch += 1;
            rank_diffs.push(RankDiff {
                rank: r,
                kind: RankDiffKind::Composition,
                missing: owned(ref_set.difference(&cand_set)),
                extra: owned(cand_set.difference(&ref_set)),
            });
            tracing::debug!(rank = r, "composition mismatch");
            continue;
        }

        comparable += 1;
        if cand == refr {
            exact += 1;
        } else {
            order_mismatch += 1;
            rank_diffs.push(RankDiff {
                rank: r,
                kind: RankDiffKind::Order,
                missing: Vec::new(),
                extra: Vec::new(),
            });
        }

        let mut ref_index: HashMap<&str, usize> = HashMap::with_capacity(refr.len());
        for (i, id) in refr.iter().enumerate() {
            ref_index.entry(id.as_str()).or_insert(i);
        }
        for (i, id) in cand.iter().enumerate() {
            if let Some(&j) = ref_index.get(id.as_str()) {
                displacement_sum += i.abs_diff(j);
                displacement_count += 1;
            }
        }
    }

    ParityResult {
        max_rank,
        comparable_layers: comparable,
        composition_mismatch_layers: composition_mismatch,
        exact_order_match_layers: exact,
        order_mismatch_layers: order_mismatch,
        displacement_sum,
        displacement_count,
        exact_order_match_rate: ratio(exact, comparable),
        avg_order_displacement: ratio(displacement_sum, displacement_count),
        rank_diffs,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn owned<S: ToString>(ids: impl Iterator<Item = S>) -> Vec<NodeId> {
    ids.map(|s| s.to_string()).collect()
}
