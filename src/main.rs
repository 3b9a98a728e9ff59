mod ck_cmd;
mod cli;
mod config;
mod convert;
mod estimate_cmd;
mod input;
mod its_cmd;
mod logging;
mod report;

use std::process;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Its(args) => its_cmd::run(args),
        Command::Estimate(args) => estimate_cmd::run(args),
        Command::Ck(args) => ck_cmd::run(args),
    }
}
