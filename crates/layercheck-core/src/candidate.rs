//! The layout engine under test, seen only through the traces it emits.

use crate::errors::{ParityError, Result};
use crate::model::Fixture;
use crate::subprocess::{run_blocking, CommandSpec, Invocation};

/// Environment variable carrying the trial count override to the engine.
pub const TRIALS_ENV: &str = "LAYERCHECK_TRIALS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceOptions {
    pub trials: Option<u32>,
}

pub trait CandidateEngine {
    fn name(&self) -> &'static str;

    /// Raw trace text for one fixture.
    fn trace(&self, fixture: &Fixture, opts: &TraceOptions) -> Result<String>;
}

/// Runs `program args.. <fixture path>` and captures the trace from stdout.
#[derive(Debug, Clone)]
pub struct CommandCandidateEngine {
    spec: CommandSpec,
}

impl CommandCandidateEngine {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl CandidateEngine for CommandCandidateEngine {
    fn name(&self) -> &'static str {
        "candidate"
    }

    fn trace(&self, fixture: &Fixture, opts: &TraceOptions) -> Result<String> {
        let envs = opts
            .trials
            .map(|n| vec![(TRIALS_ENV, n.to_string())])
            .unwrap_or_default();
        run_blocking(
            &self.spec,
            Invocation {
                fixture: &fixture.name,
                engine: self.name(),
                extra_args: vec![fixture.path.to_string_lossy().into_owned()],
                envs,
                stdin: None,
            },
        )
    }
}

/// The fixture file already is a recorded trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedTraceEngine;

impl CandidateEngine for RecordedTraceEngine {
    fn name(&self) -> &'static str {
        "recorded-trace"
    }

    fn trace(&self, fixture: &Fixture, opts: &TraceOptions) -> Result<String> {
        if opts.trials.is_some() {
            tracing::warn!(
                fixture = %fixture.name,
                "trial override has no effect on recorded traces"
            );
        }
        std::fs::read_to_string(&fixture.path).map_err(|e| ParityError::io(&fixture.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_engine_reads_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow_01.trace");
        std::fs::write(&path, "INPUT_NODE\t0\ta\n").unwrap();
        let text = RecordedTraceEngine
            .trace(&Fixture::from_path(&path), &TraceOptions::default())
            .unwrap();
        assert!(text.starts_with("INPUT_NODE"));
    }

    #[cfg(unix)]
    #[test]
    fn command_engine_passes_fixture_path_and_trials() {
        let spec = CommandSpec::from_argv(vec![
            "sh".into(),
            "-c".into(),
            "echo \"$1 $LAYERCHECK_TRIALS\"".into(),
            "engine".into(),
        ])
        .unwrap();
        let engine = CommandCandidateEngine::new(spec);
        let out = engine
            .trace(
                &Fixture::from_path("corpus/a.mmd"),
                &TraceOptions { trials: Some(4) },
            )
            .unwrap();
        assert_eq!(out.trim(), "corpus/a.mmd 4");
    }
}
