use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::fixtures::DEFAULT_CORPUS_PATTERN;
use crate::gate::{validate_gates, GateSpec};
use crate::model::Direction;
use crate::subprocess::CommandSpec;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "layercheck.yaml";
pub const DEFAULT_LAYER_SOURCE: &str = "ORDER";
pub const DEFAULT_CANDIDATE_POOL: [&str; 3] = ["seed", "reversed", "virtual"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateConfig {
    #[serde(default)]
    pub command: Option<CommandSpec>,
    /// The fixture files are pre-recorded traces.
    #[serde(default)]
    pub recorded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceConfig {
    #[serde(default)]
    pub command: Option<CommandSpec>,
    #[serde(default)]
    pub recorded_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub version: u32,
    #[serde(default)]
    pub fixtures: Vec<PathBuf>,
    #[serde(default)]
    pub corpus: Option<CorpusConfig>,
    #[serde(default)]
    pub candidate: CandidateConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default = "default_layer_source")]
    pub layer_source: String,
    #[serde(default)]
    pub trials: Option<u32>,
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: Vec<String>,
    /// Absent selects the built-in gates.
    #[serde(default)]
    pub gates: Option<Vec<GateSpec>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            fixtures: Vec::new(),
            corpus: None,
            candidate: CandidateConfig::default(),
            reference: ReferenceConfig::default(),
            direction: None,
            layer_source: default_layer_source(),
            trials: None,
            candidate_pool: default_candidate_pool(),
            gates: None,
        }
    }
}

fn default_pattern() -> String {
    DEFAULT_CORPUS_PATTERN.to_string()
}

fn default_layer_source() -> String {
    DEFAULT_LAYER_SOURCE.to_string()
}

fn default_candidate_pool() -> Vec<String> {
    DEFAULT_CANDIDATE_POOL.iter().map(|s| (*s).to_string()).collect()
}

impl RunConfig {
    /// Relative paths in a config file resolve against the file's directory.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.fixtures.iter_mut().for_each(resolve);
        if let Some(c) = &mut self.corpus {
            resolve(&mut c.root);
        }
        if let Some(dir) = &mut self.reference.recorded_dir {
            resolve(dir);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if !self.fixtures.is_empty() && self.corpus.is_some() {
            return Err(ConfigError(
                "set either fixtures or corpus, not both".into(),
            ));
        }
        if self.candidate.recorded && self.candidate.command.is_some() {
            return Err(ConfigError(
                "candidate: set either command or recorded, not both".into(),
            ));
        }
        if self.reference.recorded_dir.is_some() && self.reference.command.is_some() {
            return Err(ConfigError(
                "reference: set either command or recorded_dir, not both".into(),
            ));
        }
        if !is_stage_name(&self.layer_source) {
            return Err(ConfigError(format!(
                "layer_source must be an upper-case stage name, got '{}'",
                self.layer_source
            )));
        }
        if self.trials == Some(0) {
            return Err(ConfigError("trials must be at least 1".into()));
        }
        if self.candidate_pool.is_empty() {
            return Err(ConfigError("candidate_pool must not be empty".into()));
        }
        if let Some(gates) = &self.gates {
            validate_gates(gates)?;
        }
        Ok(())
    }
}

pub fn is_stage_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg: RunConfig = serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    cfg.validate()?;
    if let Some(base) = path.parent() {
        cfg.resolve_paths(base);
    }
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateOp;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let p = dir.join(DEFAULT_CONFIG_FILE);
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn minimal_config_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&write(dir.path(), "version: 1\n")).unwrap();
        assert_eq!(cfg.layer_source, "ORDER");
        assert_eq!(cfg.candidate_pool, ["seed", "reversed", "virtual"]);
        assert!(cfg.gates.is_none());
        assert!(cfg.direction.is_none());
    }

    #[test]
    fn full_config_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"
version: 1
corpus:
  root: corpus
candidate:
  command: [node, dist/trace.js]
reference:
  recorded_dir: refs
direction: LR
layer_source: RANK
trials: 3
gates:
  - name: layering
    rules:
      - { key: composition_mismatch, op: eq, value: 0 }
      - { key: selected_equals_oracle, scope: run, op: all }
"#;
        let cfg = load_config(&write(dir.path(), body)).unwrap();
        let corpus = cfg.corpus.unwrap();
        assert_eq!(corpus.root, dir.path().join("corpus"));
        assert_eq!(corpus.pattern, "**/*.mmd");
        assert_eq!(cfg.candidate.command.unwrap().program, "node");
        assert_eq!(cfg.reference.recorded_dir.unwrap(), dir.path().join("refs"));
        assert_eq!(cfg.direction, Some(Direction::LR));
        assert_eq!(cfg.trials, Some(3));
        let gates = cfg.gates.unwrap();
        assert_eq!(gates[0].rules.len(), 2);
        assert_eq!(gates[0].rules[1].op, GateOp::All);
    }

    #[test]
    fn rejects_bad_configs() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            ("version: 2\n", "unsupported config version"),
            ("version: 1\nunknown: true\n", "failed to parse YAML"),
            ("version: 1\nfixtures: [a]\ncorpus: { root: c }\n", "not both"),
            ("version: 1\nlayer_source: order\n", "layer_source"),
            ("version: 1\ntrials: 0\n", "trials"),
            (
                "version: 1\ngates:\n  - name: g\n    rules: [{ key: bogus, op: eq, value: 0 }]\n",
                "unknown summary key",
            ),
        ];
        for (body, needle) in cases {
            let err = load_config(&write(dir.path(), body)).unwrap_err();
            assert!(err.to_string().contains(needle), "{body:?}: {err}");
        }
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_config(Path::new("/nonexistent/layercheck.yaml")).unwrap_err();
        assert!(err.to_string().starts_with("ConfigError: failed to read config"));
    }
}
