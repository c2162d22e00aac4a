use std::fmt::Write as _;
use std::path::PathBuf;

use layercheck_core::candidate::RecordedTraceEngine;
use layercheck_core::config::is_stage_name;
use layercheck_core::reference::{ReferenceEngine, ReferenceRequest, ReferenceResponse};
use layercheck_core::report::summary::render_summary;
use layercheck_core::report::RunReport;
use layercheck_core::{ConfigError, Fixture, ParityError, Result};
use layercheck_metrics::DEFAULT_TOP_DRIFT;

use super::pipeline::{Pipeline, PipelineSettings};
use crate::cli::args::CompareArgs;
use crate::exit_codes::SUCCESS;

/// One recorded response, whatever the case name.
struct ResponseFile(PathBuf);

impl ReferenceEngine for ResponseFile {
    fn name(&self) -> &'static str {
        "recorded-reference"
    }

    fn layout(&self, case: &str, _request: &ReferenceRequest) -> Result<ReferenceResponse> {
        let text = std::fs::read_to_string(&self.0).map_err(|e| ParityError::io(&self.0, e))?;
        ReferenceResponse::from_json(case, &text)
    }
}

/// Diagnostic diff of one fixture; never enforces gates.
pub fn run(args: CompareArgs) -> anyhow::Result<i32> {
    if !is_stage_name(&args.layer_source) {
        return Err(ConfigError(format!(
            "--layer-source must be an upper-case stage name, got '{}'",
            args.layer_source
        ))
        .into());
    }
    let settings = PipelineSettings {
        mode: args.mode,
        layer_source: args.layer_source.clone(),
        direction: args.direction,
        trials: None,
        candidate_pool: layercheck_core::config::DEFAULT_CANDIDATE_POOL
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        top_drift: DEFAULT_TOP_DRIFT,
    };
    let reference = ResponseFile(args.reference.clone());
    let pipeline = Pipeline {
        candidate: &RecordedTraceEngine,
        reference: &reference,
        settings: &settings,
    };
    let report = pipeline.run_fixture(&Fixture::from_path(&args.trace))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(SUCCESS);
    }

    let mut run = RunReport::default();
    run.push(report.clone());
    let mut out = render_summary(&run);
    if let Some(parity) = &report.parity {
        for diff in &parity.rank_diffs {
            writeln!(
                out,
                "# rank {} {:?}: missing=[{}] extra=[{}]",
                diff.rank,
                diff.kind,
                diff.missing.join(","),
                diff.extra.join(",")
            )?;
        }
    }
    if let Some(geo) = &report.geometry {
        for d in &geo.top_drift {
            writeln!(out, "# drift {} {:.6}", d.id, d.distance)?;
        }
    }
    print!("{out}");
    Ok(SUCCESS)
}
