use anyhow::Result;
use propflow::cli::commands::diff::DiffOptions;
use propflow::cli::{self, Cli, Commands};
use propflow::config::load_config;
use propflow::observability::install_panic_hook;

fn main() -> Result<()> {
    install_panic_hook();
    let cli = cli::parse_args();
    cli::init_logging(cli.verbosity)?;
    dispatch(cli)
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            cli::init_config(&std::env::current_dir()?, force)?;
            Ok(())
        }
        Commands::Run {
            source,
            output_dir,
            format,
        } => {
            let (mut config, path) = load_config(cli.config.as_deref())?;
            log_config_source(path.as_deref());
            if let Some(source) = source {
                config.dataset.source = source;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            let progress = cli::progress_manager(cli.quiet, cli.verbosity);
            cli::handle_run(config, &progress, format)?;
            Ok(())
        }
        Commands::Diff {
            current,
            previous,
            format,
            output,
            tolerance,
        } => {
            let (config, path) = load_config(cli.config.as_deref())?;
            log_config_source(path.as_deref());
            cli::handle_diff(
                &config,
                DiffOptions {
                    current,
                    previous,
                    format,
                    output,
                    tolerance,
                },
            )?;
            Ok(())
        }
        Commands::Order { format } => {
            let (config, path) = load_config(cli.config.as_deref())?;
            log_config_source(path.as_deref());
            cli::handle_order(&config, format)?;
            Ok(())
        }
    }
}

fn log_config_source(path: Option<&std::path::Path>) {
    match path {
        Some(path) => log::debug!("Using config {}", path.display()),
        None => log::debug!("No config file found, using defaults"),
    }
}
