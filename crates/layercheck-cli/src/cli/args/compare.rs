use std::path::PathBuf;

use clap::Parser;
use layercheck_core::Direction;

use super::Mode;

#[derive(Parser, Clone, Debug)]
pub struct CompareArgs {
    /// Recorded candidate trace
    pub trace: PathBuf,

    /// Recorded reference response (JSON)
    pub reference: PathBuf,

    #[arg(long, default_value = layercheck_core::config::DEFAULT_LAYER_SOURCE)]
    pub layer_source: String,

    #[arg(long)]
    pub direction: Option<Direction>,

    #[arg(long, value_enum, default_value_t = Mode::Both)]
    pub mode: Mode,

    /// Print the fixture report as JSON instead of summary lines
    #[arg(long)]
    pub json: bool,
}
