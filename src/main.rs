use std::process::ExitCode;

use chainfs::{cli::Cli, disk::open_image, ops::Operations, shell::start_shell};
use clap::Parser;
use colored::*;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let fs = match open_image(&cli.image, cli.blocks, cli.format) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!(
                "{} cannot open {}: {}",
                "❌ Error:".red().bold(),
                cli.image.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    match start_shell(Operations::new(fs)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "❌ Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
