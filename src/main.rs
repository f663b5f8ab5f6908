//! Rental Engine CLI
//!
//! Command-line interface for processing equipment-rental operation
//! scripts from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --catalog catalog.csv operations.csv > bookings.csv
//! cargo run -- --catalog catalog.csv --strategy async operations.csv > bookings.csv
//! cargo run -- --catalog catalog.csv --report payments operations.csv > payments.csv
//! cargo run -- --catalog catalog.csv --today 2026-06-01 operations.csv > bookings.csv
//! ```
//!
//! The program loads the equipment catalog, applies the scripted
//! operations through the rental engine using the selected processing
//! strategy, and writes the final report to stdout. Diagnostics go to
//! stderr through `tracing` (tune with `RUST_LOG`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Fatal error (missing file, unreadable catalog, write failure)

use rental_engine::cli;
use rental_engine::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics to stderr so stdout stays a clean CSV report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    let strategy = strategy::create_strategy(args.strategy, args.today);

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.catalog, &args.input_file, args.report, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
