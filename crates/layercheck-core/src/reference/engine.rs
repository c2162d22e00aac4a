use std::path::PathBuf;

use super::protocol::{ReferenceRequest, ReferenceResponse};
use crate::errors::{ParityError, Result};
use crate::subprocess::{run_blocking, CommandSpec, Invocation};

/// Oracle layout engine. Synchronous: one request, one response.
pub trait ReferenceEngine {
    fn name(&self) -> &'static str;

    fn layout(&self, case: &str, request: &ReferenceRequest) -> Result<ReferenceResponse>;
}

/// Spawns the reference engine, writes the request as JSON to stdin and
/// decodes the response from stdout.
#[derive(Debug, Clone)]
pub struct CommandReferenceEngine {
    spec: CommandSpec,
}

impl CommandReferenceEngine {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl ReferenceEngine for CommandReferenceEngine {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn layout(&self, case: &str, request: &ReferenceRequest) -> Result<ReferenceResponse> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| ParityError::engine(case, self.name(), format!("encoding request: {e}")))?;
        let stdout = run_blocking(
            &self.spec,
            Invocation {
                fixture: case,
                engine: self.name(),
                extra_args: Vec::new(),
                envs: Vec::new(),
                stdin: Some(payload),
            },
        )?;
        ReferenceResponse::from_json(case, &stdout)
    }
}

/// Replays responses recorded from an earlier reference run: `<dir>/<case>.json`.
#[derive(Debug, Clone)]
pub struct RecordedReferenceEngine {
    dir: PathBuf,
}

impl RecordedReferenceEngine {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, case: &str) -> PathBuf {
        self.dir.join(format!("{case}.json"))
    }
}

impl ReferenceEngine for RecordedReferenceEngine {
    fn name(&self) -> &'static str {
        "recorded-reference"
    }

    fn layout(&self, case: &str, _request: &ReferenceRequest) -> Result<ReferenceResponse> {
        let path = self.path_for(case);
        let text = std::fs::read_to_string(&path).map_err(|e| ParityError::io(&path, e))?;
        ReferenceResponse::from_json(case, &text)
    }
}
