mod cli;
mod config;
mod core;
mod error;
mod logging;
mod models;
mod sources;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    logging::init(cli.verbosity());

    if let Err(e) = cli::run(cli) {
        eprintln!("오류: {:#}", e);
        std::process::exit(1);
    }
}
