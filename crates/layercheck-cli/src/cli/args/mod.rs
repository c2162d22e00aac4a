use clap::{Parser, Subcommand};

pub mod compare;
pub mod gate;
pub mod run;
pub use compare::*;
pub use gate::*;
pub use run::*;

#[derive(Parser)]
#[command(
    name = "layercheck",
    version,
    about = "Layering parity oracle: compares a layered graph layout engine against a reference engine"
)]
pub struct Cli {
    /// Log filter directive, e.g. `debug` or `layercheck_core=trace` (default: RUST_LOG, then info)
    #[arg(long, global = true, env = "LAYERCHECK_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate every fixture, print the summary and enforce gates
    Run(RunArgs),
    /// Re-evaluate gates over a saved summary
    Gate(GateArgs),
    /// Diff one recorded trace against one recorded reference response
    Compare(CompareArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "layercheck",
            "run",
            "a.trace",
            "b.trace",
            "--recorded-traces",
            "--reference-dir",
            "refs",
            "--mode",
            "both",
            "--direction",
            "lr",
            "--trials",
            "4",
        ])
        .unwrap();
        let Command::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert_eq!(args.fixtures.len(), 2);
        assert!(args.recorded_traces);
        assert_eq!(args.mode, Mode::Both);
        assert_eq!(args.direction, Some(layercheck_core::Direction::LR));
        assert_eq!(args.trials, Some(4));
    }

    #[test]
    fn conflicting_sources_are_rejected() {
        assert!(Cli::try_parse_from([
            "layercheck",
            "run",
            "--recorded-traces",
            "--candidate-cmd",
            "engine",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["layercheck", "run", "a.trace", "--corpus", "dir"]).is_err());
    }
}
