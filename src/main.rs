use clap::Parser;
use sensor_replay::cli::{self, Args};
use std::process;

fn main() {
    let args = Args::parse();

    if let Err(error) = cli::setup_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {}", error);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    match runtime.block_on(cli::run(args)) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
