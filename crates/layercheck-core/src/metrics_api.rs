//! Result records shared by the metrics crate, reports and gates.
//!
//! Records are built once by the metric that computes them and only folded
//! into summaries afterwards.

use serde::Serialize;

use crate::model::NodeId;

/// Why a rank did not match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDiffKind {
    Composition,
    Order,
}

/// Per-rank diagnostic for a non-exact rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankDiff {
    pub rank: usize,
    pub kind: RankDiffKind,
    /// In the reference rank but not the candidate rank.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<NodeId>,
    /// In the candidate rank but not the reference rank.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<NodeId>,
}

/// Metrics of one (candidate, reference) layering pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParityResult {
    pub max_rank: usize,
    pub comparable_layers: usize,
    pub composition_mismatch_layers: usize,
    pub exact_order_match_layers: usize,
    pub order_mismatch_layers: usize,
    pub displacement_sum: usize,
    pub displacement_count: usize,
    pub exact_order_match_rate: f64,
    pub avg_order_displacement: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rank_diffs: Vec<RankDiff>,
}

impl ParityResult {
    /// Ranks that are not an exact match, for whatever reason.
    pub fn mismatched_layers(&self) -> usize {
        self.composition_mismatch_layers + self.order_mismatch_layers
    }

    pub fn is_exact(&self) -> bool {
        self.mismatched_layers() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDrift {
    pub id: NodeId,
    pub distance: f64,
}

/// Coordinate agreement over the nodes both renderings share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryResult {
    pub shared_nodes: usize,
    pub rmse: f64,
    pub max_drift: f64,
    /// Largest drifts first.
    pub top_drift: Vec<NodeDrift>,
    pub inversion_count: usize,
    pub pair_count: usize,
    pub inversion_rate: f64,
}

/// One candidate scored against the reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub label: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossings: Option<u64>,
    pub composition_mismatch: usize,
    pub order_mismatch: usize,
    pub avg_order_displacement: f64,
    pub exact_order_match_rate: f64,
}

/// Oracle-best and selection gap over a candidate set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapAnalysis {
    pub scores: Vec<CandidateScore>,
    pub oracle_best: usize,
    pub selected: String,
    pub selected_mismatch: usize,
    pub selection_gap: usize,
    /// Winner of the composite ranking.
    pub best: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_pass: Option<u32>,
}

impl GapAnalysis {
    pub fn selected_is_oracle(&self) -> bool {
        self.selection_gap == 0
    }
}
