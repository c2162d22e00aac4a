//! Blocking call-and-wait invocation of external layout engines.
//!
//! No retry and no timeout: a non-zero exit status or undecodable output is
//! fatal for the fixture. A hung engine is left to the operator.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};

use crate::errors::{ParityError, Result};

/// Cap on captured stderr carried into error messages.
const STDERR_CAP: usize = 4096;

/// Program plus fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut it = argv.into_iter();
        let program = it.next().filter(|p| !p.trim().is_empty())?;
        Some(Self {
            program,
            args: it.collect(),
        })
    }

    /// Whitespace-split command line, as given on the CLI.
    pub fn parse(cmdline: &str) -> Option<Self> {
        Self::from_argv(cmdline.split_whitespace().map(str::to_string).collect())
    }
}

impl TryFrom<Vec<String>> for CommandSpec {
    type Error = String;

    fn try_from(argv: Vec<String>) -> std::result::Result<Self, Self::Error> {
        Self::from_argv(argv).ok_or_else(|| "command must name a program".to_string())
    }
}

impl From<CommandSpec> for Vec<String> {
    fn from(spec: CommandSpec) -> Self {
        std::iter::once(spec.program).chain(spec.args).collect()
    }
}

pub(crate) struct Invocation<'a> {
    pub fixture: &'a str,
    pub engine: &'static str,
    pub extra_args: Vec<String>,
    pub envs: Vec<(&'static str, String)>,
    pub stdin: Option<Vec<u8>>,
}

/// Run the command to completion and return its stdout.
pub(crate) fn run_blocking(spec: &CommandSpec, inv: Invocation<'_>) -> Result<String> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .args(&inv.extra_args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if inv.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    for (key, value) in &inv.envs {
        cmd.env(key, value);
    }

    tracing::debug!(
        fixture = inv.fixture,
        engine = inv.engine,
        program = %spec.program,
        "spawning engine"
    );
    let mut child = cmd.spawn().map_err(|e| {
        ParityError::engine(
            inv.fixture,
            inv.engine,
            format!("spawning {}: {}", spec.program, e),
        )
    })?;

    // Feed stdin from a separate thread so a chatty child cannot deadlock us.
    let writer = match (inv.stdin, child.stdin.take()) {
        (Some(payload), Some(mut pipe)) => Some(std::thread::spawn(move || {
            pipe.write_all(&payload)
            // pipe dropped here, closing the child's stdin
        })),
        _ => None,
    };

    let output = child.wait_with_output().map_err(|e| {
        ParityError::engine(inv.fixture, inv.engine, format!("waiting for engine: {e}"))
    })?;

    if let Some(handle) = writer {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if output.status.success() => {
                return Err(ParityError::engine(
                    inv.fixture,
                    inv.engine,
                    format!("writing request: {e}"),
                ));
            }
            Ok(Err(_)) => {}
            Err(_) => {
                return Err(ParityError::engine(
                    inv.fixture,
                    inv.engine,
                    "request writer thread panicked",
                ));
            }
        }
    }

    if !output.status.success() {
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        truncate_at_char_boundary(&mut stderr, STDERR_CAP);
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".into());
        return Err(ParityError::engine(
            inv.fixture,
            inv.engine,
            format!("exit status {code}: {}", stderr.trim()),
        ));
    }

    String::from_utf8(output.stdout).map_err(|_| {
        ParityError::engine(inv.fixture, inv.engine, "stdout is not valid UTF-8")
    })
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
