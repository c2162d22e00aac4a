pub mod json;
pub mod summary;

use serde::Serialize;

use crate::metrics_api::{GapAnalysis, GeometryResult, ParityResult};
use crate::model::Direction;
use crate::reference::LayerOrigin;

/// Everything measured for one fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureReport {
    pub name: String,
    pub direction: Direction,
    pub layer_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_origin: Option<LayerOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parity: Option<ParityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<GapAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes: Option<GapAnalysis>,
}

impl FixtureReport {
    pub fn new(name: impl Into<String>, direction: Direction, layer_source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction,
            layer_source: layer_source.into(),
            reference_origin: None,
            parity: None,
            geometry: None,
            candidates: None,
            passes: None,
        }
    }
}

/// Run-wide counters, folded from fixture reports in fixture order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunTotals {
    pub fixtures: usize,
    pub compared_layers: usize,
    pub mismatched_layers: usize,
    pub composition_mismatch: usize,
    pub order_mismatch: usize,
    pub geometry_cases: usize,
    pub inversion_rate_sum: f64,
    pub candidate_cases: usize,
    pub selected_equals_oracle: usize,
    pub total_selection_gap: usize,
    pub pass_cases: usize,
    pub pass_selected_equals_oracle: usize,
    pub total_pass_selection_gap: usize,
}

impl RunTotals {
    pub fn add(&mut self, report: &FixtureReport) {
        self.fixtures += 1;
        if let Some(p) = &report.parity {
            self.compared_layers += p.max_rank;
            self.mismatched_layers += p.mismatched_layers();
            self.composition_mismatch += p.composition_mismatch_layers;
            self.order_mismatch += p.order_mismatch_layers;
        }
        if let Some(g) = &report.geometry {
            self.geometry_cases += 1;
            self.inversion_rate_sum += g.inversion_rate;
        }
        if let Some(gap) = &report.candidates {
            self.candidate_cases += 1;
            self.total_selection_gap += gap.selection_gap;
            if gap.selected_is_oracle() {
                self.selected_equals_oracle += 1;
            }
        }
        if let Some(gap) = &report.passes {
            self.pass_cases += 1;
            self.total_pass_selection_gap += gap.selection_gap;
            if gap.selected_is_oracle() {
                self.pass_selected_equals_oracle += 1;
            }
        }
    }

    /// Mean inversion rate over fixtures with a geometry comparison.
    pub fn avg_inversion_rate(&self) -> Option<f64> {
        (self.geometry_cases > 0).then(|| self.inversion_rate_sum / self.geometry_cases as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub fixtures: Vec<FixtureReport>,
    pub totals: RunTotals,
}

impl RunReport {
    pub fn push(&mut self, report: FixtureReport) {
        self.totals.add(&report);
        self.fixtures.push(report);
    }
}

impl FromIterator<FixtureReport> for RunReport {
    fn from_iter<I: IntoIterator<Item = FixtureReport>>(iter: I) -> Self {
        let mut run = RunReport::default();
        for r in iter {
            run.push(r);
        }
        run
    }
}
