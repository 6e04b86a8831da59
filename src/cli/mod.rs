//! CLI module for propflow
//!
//! This module provides the command-line interface, including:
//! - Argument parsing (`args`)
//! - Command handlers (`commands`)
//! - Runtime setup (`setup`)

pub mod args;
pub mod commands;
pub mod setup;

pub use args::{Cli, Commands, OutputFormat};
pub use commands::{handle_diff, handle_order, handle_run, init_config};
pub use setup::{init_logging, progress_manager};

/// Parse CLI arguments using Clap
pub fn parse_args() -> Cli {
    args::parse_args()
}
