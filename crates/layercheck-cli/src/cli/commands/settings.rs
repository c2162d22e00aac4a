//! Flag / config / default resolution for `run`.

use std::path::Path;

use layercheck_core::candidate::{CandidateEngine, CommandCandidateEngine, RecordedTraceEngine};
use layercheck_core::config::{is_stage_name, load_config, RunConfig, DEFAULT_CONFIG_FILE};
use layercheck_core::fixtures::{CorpusDiscovery, FixtureList, FixtureSource, DEFAULT_CORPUS_PATTERN};
use layercheck_core::gate::GateSpec;
use layercheck_core::reference::{CommandReferenceEngine, RecordedReferenceEngine, ReferenceEngine};
use layercheck_core::subprocess::CommandSpec;
use layercheck_core::ConfigError;

use super::pipeline::PipelineSettings;
use crate::cli::args::RunArgs;

pub(crate) struct RunSettings {
    pub fixtures: Box<dyn FixtureSource>,
    pub candidate: Box<dyn CandidateEngine>,
    pub reference: Box<dyn ReferenceEngine>,
    pub pipeline: PipelineSettings,
    pub gates: Option<Vec<GateSpec>>,
}

/// Explicit config path, else `./layercheck.yaml` when present, else defaults.
pub(crate) fn load_config_or_default(explicit: Option<&Path>) -> Result<RunConfig, ConfigError> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                load_config(default)
            } else {
                Ok(RunConfig::default())
            }
        }
    }
}

pub(crate) fn resolve(args: &RunArgs) -> Result<RunSettings, ConfigError> {
    let cfg = load_config_or_default(args.config.as_deref())?;

    let layer_source = args
        .layer_source
        .clone()
        .unwrap_or_else(|| cfg.layer_source.clone());
    if !is_stage_name(&layer_source) {
        return Err(ConfigError(format!(
            "--layer-source must be an upper-case stage name, got '{layer_source}'"
        )));
    }
    if args.trials == Some(0) {
        return Err(ConfigError("--trials must be at least 1".into()));
    }

    let pipeline = PipelineSettings {
        mode: args.mode,
        layer_source,
        direction: args.direction.or(cfg.direction),
        trials: args.trials.or(cfg.trials),
        candidate_pool: cfg.candidate_pool.clone(),
        top_drift: args.top_drift,
    };

    Ok(RunSettings {
        fixtures: fixture_source(args, &cfg)?,
        candidate: candidate_engine(args, &cfg)?,
        reference: reference_engine(args, &cfg)?,
        pipeline,
        gates: cfg.gates,
    })
}

fn fixture_source(args: &RunArgs, cfg: &RunConfig) -> Result<Box<dyn FixtureSource>, ConfigError> {
    if !args.fixtures.is_empty() {
        return Ok(Box::new(FixtureList::new(args.fixtures.clone())));
    }
    if let Some(root) = &args.corpus {
        let pattern = args
            .pattern
            .as_deref()
            .or(cfg.corpus.as_ref().map(|c| c.pattern.as_str()))
            .unwrap_or(DEFAULT_CORPUS_PATTERN);
        return Ok(Box::new(CorpusDiscovery::new(root, pattern)?));
    }
    if !cfg.fixtures.is_empty() {
        return Ok(Box::new(FixtureList::new(cfg.fixtures.clone())));
    }
    if let Some(corpus) = &cfg.corpus {
        let pattern = args.pattern.as_deref().unwrap_or(&corpus.pattern);
        return Ok(Box::new(CorpusDiscovery::new(&corpus.root, pattern)?));
    }
    Err(ConfigError(
        "no fixtures: pass fixture paths, --corpus, or set fixtures/corpus in the config".into(),
    ))
}

fn command(flag: &str, cmdline: &str) -> Result<CommandSpec, ConfigError> {
    CommandSpec::parse(cmdline).ok_or_else(|| ConfigError(format!("{flag} must name a program")))
}

fn candidate_engine(args: &RunArgs, cfg: &RunConfig) -> Result<Box<dyn CandidateEngine>, ConfigError> {
    if let Some(cmdline) = &args.candidate_cmd {
        return Ok(Box::new(CommandCandidateEngine::new(command("--candidate-cmd", cmdline)?)));
    }
    if args.recorded_traces || cfg.candidate.recorded {
        return Ok(Box::new(RecordedTraceEngine));
    }
    if let Some(spec) = &cfg.candidate.command {
        return Ok(Box::new(CommandCandidateEngine::new(spec.clone())));
    }
    Err(ConfigError(
        "no candidate engine: use --candidate-cmd or --recorded-traces".into(),
    ))
}

fn reference_engine(args: &RunArgs, cfg: &RunConfig) -> Result<Box<dyn ReferenceEngine>, ConfigError> {
    if let Some(cmdline) = &args.reference_cmd {
        return Ok(Box::new(CommandReferenceEngine::new(command("--reference-cmd", cmdline)?)));
    }
    if let Some(dir) = &args.reference_dir {
        return Ok(Box::new(RecordedReferenceEngine::new(dir)));
    }
    if let Some(spec) = &cfg.reference.command {
        return Ok(Box::new(CommandReferenceEngine::new(spec.clone())));
    }
    if let Some(dir) = &cfg.reference.recorded_dir {
        return Ok(Box::new(RecordedReferenceEngine::new(dir)));
    }
    Err(ConfigError(
        "no reference engine: use --reference-cmd or --reference-dir".into(),
    ))
}
