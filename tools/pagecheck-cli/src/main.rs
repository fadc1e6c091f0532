use std::process::ExitCode;

use clap::Parser;

use pagecheck_cli::cli::{Cli, Command};
use pagecheck_cli::error::PageCheckError;
use pagecheck_cli::settings::{self, Settings};
use pagecheck_cli::{check, inspect, logger, output};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if logger::init(logger::level_for(cli.verbose, cli.quiet)).is_err() {
        eprintln!("warning: logger already initialized");
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            output::emit_error(cli.output, e.exit_code_num(), &e.to_string());
            e.exit_code()
        }
    }
}

/// Errors returned here have not produced any stdout output yet. Once a
/// report is printed, a failing verdict only sets the exit code.
fn run(cli: &Cli) -> Result<ExitCode, PageCheckError> {
    let settings = match &cli.config {
        Some(path) => settings::load(path)?,
        None => Settings::default(),
    };

    let verdict = match &cli.command {
        Command::Check(args) => {
            let report = check::run(args, &settings)?;
            output::emit(cli.output, &report)?;
            check::verdict(&report)
        }
        Command::Inspect(args) => {
            let report = inspect::run(args, &settings)?;
            output::emit(cli.output, &report)?;
            inspect::verdict(&report)
        }
    };

    Ok(match verdict {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::info!("[PageCheck] {e}");
            e.exit_code()
        }
    })
}
