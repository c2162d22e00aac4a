use layercheck_core::candidate::{CandidateEngine, TraceOptions};
use layercheck_core::reference::{build_reference_layering, ReferenceEngine, ReferenceRequest};
use layercheck_core::report::{FixtureReport, RunReport};
use layercheck_core::trace::parse_trace;
use layercheck_core::{Direction, Fixture, ParityError, Result};
use layercheck_metrics::{analyze_candidates, analyze_passes, compare_geometry, compare_layerings};

use crate::cli::args::Mode;

#[derive(Debug, Clone)]
pub(crate) struct PipelineSettings {
    pub mode: Mode,
    pub layer_source: String,
    /// Wins over the trace's own `INPUT_DIRECTION`.
    pub direction: Option<Direction>,
    pub trials: Option<u32>,
    pub candidate_pool: Vec<String>,
    pub top_drift: usize,
}

/// One fixture end to end: candidate trace, reference layout, comparisons.
pub(crate) struct Pipeline<'a> {
    pub candidate: &'a dyn CandidateEngine,
    pub reference: &'a dyn ReferenceEngine,
    pub settings: &'a PipelineSettings,
}

impl Pipeline<'_> {
    /// Fail-fast: the first fixture error aborts the run.
    pub fn run_all(&self, fixtures: &[Fixture]) -> Result<RunReport> {
        fixtures.iter().map(|f| self.run_fixture(f)).collect()
    }

    pub fn run_fixture(&self, fixture: &Fixture) -> Result<FixtureReport> {
        let opts = TraceOptions {
            trials: self.settings.trials,
        };
        let text = self.candidate.trace(fixture, &opts)?;
        self.evaluate(&fixture.name, &text)
    }

    pub fn evaluate(&self, name: &str, text: &str) -> Result<FixtureReport> {
        let s = self.settings;
        let trace = parse_trace(name, text)?;
        let direction = s.direction.or(trace.direction).unwrap_or_default();
        let request = ReferenceRequest::from_graph(&trace.graph, direction);
        let response = self.reference.layout(name, &request)?;

        let mut report = FixtureReport::new(name, direction, &s.layer_source);

        if s.mode.layering() {
            let candidate = trace.stage_layering(&s.layer_source)?;
            let reference = build_reference_layering(&trace.graph, direction, &response);
            report.reference_origin = Some(reference.origin);
            report.parity = Some(compare_layerings(&candidate, &reference.layering));

            if let Some(sel) = &trace.selection {
                let candidates = trace.candidates();
                if !candidates.is_empty() {
                    report.candidates = Some(analyze_candidates(
                        name,
                        &reference.layering,
                        &candidates,
                        &sel.source,
                        &s.candidate_pool,
                    )?);
                }
            }
            if let Some((passes, selected)) = trace.selected_passes()? {
                report.passes = Some(analyze_passes(name, &reference.layering, &passes, selected)?);
            }
        }

        if s.mode.geometry() {
            match compare_geometry(name, &trace.coordinates, response.rows(), direction, s.top_drift) {
                Ok(g) => report.geometry = Some(g),
                Err(e @ ParityError::InsufficientData { .. }) if s.mode == Mode::Both => {
                    tracing::warn!(fixture = name, "{e}; geometry skipped");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            fixture = name,
            direction = %direction,
            composition_mismatch = report.parity.as_ref().map(|p| p.composition_mismatch_layers),
            order_mismatch = report.parity.as_ref().map(|p| p.order_mismatch_layers),
            inversion_rate = report.geometry.as_ref().map(|g| g.inversion_rate),
            "fixture evaluated"
        );
        Ok(report)
    }
}
