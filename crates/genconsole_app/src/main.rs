mod app;
mod cli;
mod config;
mod effects;
mod export;
mod job;
mod logging;
mod ui;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use genconsole_core::SessionPhase;

use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::job::GenerationJob;
use crate::logging::LogDestination;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(SessionPhase::Completed) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<SessionPhase> {
    match cli.command {
        Command::Generate(args) => {
            let mut settings =
                Settings::load(args.config.as_deref()).context("loading settings")?;
            settings.apply_args(&args);
            logging::initialize(
                LogDestination::from_flag(settings.log_to_file),
                console_logging::parse_level(&settings.log_level),
            );

            let job = GenerationJob::from_args(&args)?;
            app::run_generation(&settings, job)
        }
    }
}
