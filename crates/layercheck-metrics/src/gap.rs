use std::cmp::Ordering;

use layercheck_core::errors::{ParityError, Result};
use layercheck_core::metrics_api::{CandidateScore, GapAnalysis};
use layercheck_core::model::{Candidate, Layering};

use crate::layering::compare_layerings;

pub fn score_candidate(reference: &Layering, candidate: &Candidate) -> CandidateScore {
    let r = compare_layerings(&candidate.layering, reference);
    CandidateScore {
        label: candidate.label(),
        source: candidate.source.clone(),
        trial: candidate.trial,
        pass: candidate.pass,
        crossings: candidate.crossings,
        composition_mismatch: r.composition_mismatch_layers,
        order_mismatch: r.order_mismatch_layers,
        avg_order_displacement: r.avg_order_displacement,
        exact_order_match_rate: r.exact_order_match_rate,
    }
}

/// Composite ranking: fewer composition mismatches, fewer order mismatches,
/// lower displacement, higher exact-match rate, lower pass index, label.
pub fn composite_order(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    a.composition_mismatch
        .cmp(&b.composition_mismatch)
        .then(a.order_mismatch.cmp(&b.order_mismatch))
        .then(a.avg_order_displacement.total_cmp(&b.avg_order_displacement))
        .then(b.exact_order_match_rate.total_cmp(&a.exact_order_match_rate))
        .then(a.pass.cmp(&b.pass))
        .then_with(|| a.label.cmp(&b.label))
}

/// Oracle-best over independent named candidates.
///
/// The considered set is every candidate whose source is in `pool`, plus the
/// selected one, so the gap can never be negative.
pub fn analyze_candidates(
    fixture: &str,
    reference: &Layering,
    candidates: &[Candidate],
    selected: &str,
    pool: &[String],
) -> Result<GapAnalysis> {
    if !candidates.iter().any(|c| c.source == selected) {
        return Err(ParityError::parse(
            fixture,
            format!("selected candidate '{selected}' has no layering in the trace"),
        ));
    }
    let scores: Vec<CandidateScore> = candidates
        .iter()
        .filter(|c| c.source == selected || pool.iter().any(|p| *p == c.source))
        .map(|c| score_candidate(reference, c))
        .collect();
    summarize(fixture, scores, |s| s.source == selected)
}

/// Oracle-best over the passes of the selected trial.
pub fn analyze_passes(
    fixture: &str,
    reference: &Layering,
    passes: &[Candidate],
    selected_pass: u32,
) -> Result<GapAnalysis> {
    let scores: Vec<CandidateScore> = passes
        .iter()
        .map(|c| score_candidate(reference, c))
        .collect();
    summarize(fixture, scores, |s| s.pass == Some(selected_pass))
}

fn summarize(
    fixture: &str,
    scores: Vec<CandidateScore>,
    is_selected: impl Fn(&CandidateScore) -> bool,
) -> Result<GapAnalysis> {
    let Some(selected) = scores.iter().find(|s| is_selected(s)) else {
        return Err(ParityError::parse(
            fixture,
            "selected candidate is not part of the compared set",
        ));
    };
    let oracle_best = scores
        .iter()
        .map(|s| s.order_mismatch)
        .min()
        .unwrap_or(selected.order_mismatch);
    let best = scores
        .iter()
        .min_by(|a, b| composite_order(a, b))
        .unwrap_or(selected);
    let (best_label, best_pass) = (best.label.clone(), best.pass);
    let (selected_label, selected_mismatch) = (selected.label.clone(), selected.order_mismatch);

    let analysis = GapAnalysis {
        oracle_best,
        selected: selected_label,
        selected_mismatch,
        selection_gap: selected_mismatch - oracle_best,
        best: best_label,
        best_pass,
        scores,
    };
    tracing::debug!(
        fixture,
        oracle_best,
        selected = %analysis.selected,
        gap = analysis.selection_gap,
        best = %analysis.best,
        "selection gap"
    );
    Ok(analysis)
}
