use layercheck_core::{ConfigError, ParityError};

use super::args::*;
use crate::exit_codes::{CONFIG_ERROR, FIXTURE_ERROR, GATE_VIOLATION};

pub mod compare;
pub mod gate;
pub(crate) mod pipeline;
pub mod run;
pub(crate) mod settings;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args),
        Command::Gate(args) => gate::run(args),
        Command::Compare(args) => compare::run(args),
    }
}

/// Exit code for an error that escaped a command.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ParityError>() {
        return match e {
            ParityError::Gate(_) => GATE_VIOLATION,
            _ => FIXTURE_ERROR,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return CONFIG_ERROR;
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return FIXTURE_ERROR;
    }
    CONFIG_ERROR
}
