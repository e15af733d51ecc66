mod cli;
mod commands;

use std::process;

use clap::Parser;

use crate::cli::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = notify2_core::logging::init("notify2", args.verbose) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    if let Err(e) = commands::execute(args.command, &args.source).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
