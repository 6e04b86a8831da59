use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    #[default]
    Terminal,
}

#[derive(Parser, Debug)]
#[command(name = "propflow")]
#[command(about = "Property dataset ETL pipeline with snapshot diffing", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the nearest .propflow.toml)
    #[arg(short, long, global = true, env = "PROPFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Suppress progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: stages, diff, and publication
    Run {
        /// Override the base dataset path
        #[arg(long)]
        source: Option<PathBuf>,

        /// Override the output directory
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,

        /// Format of the diff summary printed at the end
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,
    },

    /// Diff two dataset snapshots without running stages
    Diff {
        /// Current snapshot (JSON)
        current: PathBuf,

        /// Previous snapshot (JSON); omit for first-run behavior
        previous: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Numeric tolerance (defaults to the configured one)
        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Print the resolved stage order and independent stage levels
    Order {
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,
    },

    /// Write a starter .propflow.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
