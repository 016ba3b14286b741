//! `repokit` command-line entry point.
//!
//! # Responsibility
//! - Load settings and start logging before touching the registry.
//! - Print the binding table the registrar produces for the sample catalog.

use clap::Parser;
use std::process::ExitCode;

mod commands;
mod demo;
mod output;

use commands::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
