use anyhow::Context;
use layercheck_core::gate::GateEvaluator;
use layercheck_core::report::json::write_json;
use layercheck_core::report::summary::render_summary;
use layercheck_core::ConfigError;

use super::gate::evaluate_summary;
use super::pipeline::Pipeline;
use super::settings::resolve;
use crate::cli::args::RunArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: RunArgs) -> anyhow::Result<i32> {
    let settings = resolve(&args)?;
    // Validate gates before spending time on engines.
    let evaluator = GateEvaluator::new(settings.gates.clone())?;

    let fixtures = settings.fixtures.fixtures()?;
    if fixtures.is_empty() {
        return Err(ConfigError("fixture selection matched no files".into()).into());
    }
    tracing::info!(
        fixtures = fixtures.len(),
        candidate = settings.candidate.name(),
        reference = settings.reference.name(),
        mode = ?settings.pipeline.mode,
        layer_source = %settings.pipeline.layer_source,
        "starting run"
    );

    let pipeline = Pipeline {
        candidate: settings.candidate.as_ref(),
        reference: settings.reference.as_ref(),
        settings: &settings.pipeline,
    };
    let report = pipeline.run_all(&fixtures)?;

    let summary = render_summary(&report);
    print!("{summary}");

    if let Some(path) = &args.summary_out {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &summary)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
    }
    if let Some(path) = &args.json {
        write_json(&report, path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote JSON report");
    }

    if args.no_gates {
        return Ok(SUCCESS);
    }
    evaluate_summary(&evaluator, "run summary", &summary)
}
