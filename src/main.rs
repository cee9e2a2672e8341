use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use run::RunArgs;

mod run;

/// Real-time weakly compressible SPH fluid simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a dam break, optionally recording every frame.
    Run(RunArgs),
    /// Print the metadata of a recording.
    Info {
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run::run(args),
        Command::Info { path } => run::print_info(path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
