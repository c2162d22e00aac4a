use anyhow::Context;
use layercheck_core::gate::GateEvaluator;
use layercheck_core::ParityError;

use super::settings::load_config_or_default;
use crate::cli::args::GateArgs;
use crate::exit_codes::{GATE_VIOLATION, SUCCESS};

pub fn run(args: GateArgs) -> anyhow::Result<i32> {
    let cfg = load_config_or_default(args.config.as_deref())?;
    let evaluator = GateEvaluator::new(cfg.gates)?;
    let text = std::fs::read_to_string(&args.summary)
        .with_context(|| format!("failed to read summary {}", args.summary.display()))?;
    evaluate_summary(&evaluator, &args.summary.display().to_string(), &text)
}

/// Gate violations become an exit code; malformed summaries stay errors.
pub(crate) fn evaluate_summary(
    evaluator: &GateEvaluator,
    source: &str,
    text: &str,
) -> anyhow::Result<i32> {
    match evaluator.evaluate_text(source, text) {
        Ok(outcome) => {
            tracing::info!(
                gates = outcome.gates_run,
                checks = outcome.checks,
                skipped = outcome.skipped,
                "all gates passed"
            );
            Ok(SUCCESS)
        }
        Err(ParityError::Gate(v)) => {
            eprintln!("GATE FAILED: {v}");
            Ok(GATE_VIOLATION)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::FIXTURE_ERROR;
    use crate::cli::commands::exit_code_for;

    const CLEAN: &str = "=== flow_01 ===\ncomposition_mismatch=0\norder_mismatch=2\nfixtures=1\n";

    #[test]
    fn clean_summary_passes_default_gates() {
        let ev = GateEvaluator::new(None).unwrap();
        assert_eq!(evaluate_summary(&ev, "s", CLEAN).unwrap(), SUCCESS);
    }

    #[test]
    fn composition_mismatch_is_a_violation() {
        let ev = GateEvaluator::new(None).unwrap();
        let text = CLEAN.replace("composition_mismatch=0", "composition_mismatch=1");
        assert_eq!(evaluate_summary(&ev, "s", &text).unwrap(), GATE_VIOLATION);
    }

    #[test]
    fn malformed_summary_is_a_fixture_error() {
        let ev = GateEvaluator::new(None).unwrap();
        let err = evaluate_summary(&ev, "s", "composition_mismatch=0\n").unwrap_err();
        assert_eq!(exit_code_for(&err), FIXTURE_ERROR);
    }
}
