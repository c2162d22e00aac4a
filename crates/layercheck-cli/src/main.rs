use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
pub mod exit_codes;

use cli::args::Cli;
use cli::commands::{dispatch, exit_code_for};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr; stdout carries the summary lines only.
fn init_logging(level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn log_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|e| {
            eprintln!("warning: invalid --log-level '{directive}' ({e}), using info");
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}
