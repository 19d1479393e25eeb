//! Cellsplat Application
//!
//! Command-line front end for the cell pipeline:
//! - `split`: partition a structure-from-motion scene into grid cells
//! - `merge`: cull and concatenate per-cell splat assets
//! - `inspect`: print scene statistics

mod app;
mod cli;

use clap::Parser;

use crate::app::{AppBuilder, LoggingConfig};
use crate::cli::Args;

fn main() {
    let args = Args::parse();

    let app = AppBuilder::new().with_logging(LoggingConfig {
        level: args.log_level,
    });

    if let Err(e) = app.run(args.command) {
        eprintln!("Error: {}", app::error_report(e.as_ref()));
        std::process::exit(1);
    }
}
