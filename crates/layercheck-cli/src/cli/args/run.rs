//! `run` arguments. Flags override `layercheck.yaml`, which overrides built-in defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use layercheck_core::Direction;
use layercheck_metrics::DEFAULT_TOP_DRIFT;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Layering parity and selection gaps
    #[default]
    Layering,
    /// Coordinate parity only
    Geometry,
    /// Both; a fixture without enough shared coordinates skips geometry
    Both,
}

impl Mode {
    pub fn layering(self) -> bool {
        matches!(self, Mode::Layering | Mode::Both)
    }

    pub fn geometry(self) -> bool {
        matches!(self, Mode::Geometry | Mode::Both)
    }
}

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// Fixture files (overrides config `fixtures` and `corpus`)
    pub fixtures: Vec<PathBuf>,

    /// Discover fixtures under this directory instead of listing them
    #[arg(long, conflicts_with = "fixtures")]
    pub corpus: Option<PathBuf>,

    /// Glob for corpus discovery, relative to the corpus root (default: **/*.mmd)
    #[arg(long)]
    pub pattern: Option<String>,

    /// Config file (default: ./layercheck.yaml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Layering stage compared against the reference (default: ORDER)
    #[arg(long)]
    pub layer_source: Option<String>,

    /// Trial count forwarded to the candidate engine
    #[arg(long)]
    pub trials: Option<u32>,

    /// Layout direction override (TB, TD, BT, LR, RL)
    #[arg(long)]
    pub direction: Option<Direction>,

    #[arg(long, value_enum, default_value_t = Mode::Layering)]
    pub mode: Mode,

    /// Candidate engine command line; the fixture path is appended
    #[arg(long, conflicts_with = "recorded_traces")]
    pub candidate_cmd: Option<String>,

    /// Fixture files are pre-recorded candidate traces
    #[arg(long)]
    pub recorded_traces: bool,

    /// Reference engine command line (JSON request on stdin)
    #[arg(long, conflicts_with = "reference_dir")]
    pub reference_cmd: Option<String>,

    /// Directory of recorded reference responses, one `<fixture>.json` each
    #[arg(long)]
    pub reference_dir: Option<PathBuf>,

    /// Write the full JSON report here
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Also write the summary lines to this file
    #[arg(long)]
    pub summary_out: Option<PathBuf>,

    /// Print the summary without enforcing gates
    #[arg(long)]
    pub no_gates: bool,

    /// Drift entries kept per fixture in the JSON report
    #[arg(long, default_value_t = DEFAULT_TOP_DRIFT)]
    pub top_drift: usize,
}
