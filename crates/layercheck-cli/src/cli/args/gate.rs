use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
pub struct GateArgs {
    /// Summary file written by `run --summary-out`
    pub summary: PathBuf,

    /// Config file providing `gates` (default: built-in gates)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
