use std::process::ExitCode;

use clap::Parser;

use depscope_cli::cli::{Cli, Commands};
use depscope_cli::commands;
use depscope_cli::error::CliError;
use depscope_cli::logging;
use depscope_cli::output::OutputWriter;
use depscope_core::config::{DepscopeConfig, GeneralConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are reported by the command itself; here only logging settings matter.
    let mut general = DepscopeConfig::load_or_default(&cli.config)
        .await
        .map(|c| c.general)
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }

    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("error: {e}");
        return exit_code(&e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("error: {e}");
            exit_code(&e)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Inspect(args) => commands::inspect::execute(args, config_path, &writer).await,
        Commands::Search(args) => commands::search::execute(args, config_path, &writer).await,
        Commands::Info(args) => commands::info::execute(args, config_path, &writer).await,
        Commands::Scan(args) => commands::scan::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}

fn exit_code(err: &CliError) -> ExitCode {
    ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
}
