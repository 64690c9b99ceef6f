//! bruv - personal Gerrit review triage

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

use cli::commands::{
    run_list, run_pipeline, run_queries, run_read, run_shell, run_state, run_unread,
};
use cli::{Cli, Commands};

/// Environment variable holding the log filter, e.g. `BRUV_LOG=bruv_core=debug`.
const LOG_ENV_VAR: &str = "BRUV_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let format = cli.format;

    match cli.command {
        Commands::List {
            name,
            query,
            filter,
        } => {
            run_list(config, name.as_deref(), query.as_deref(), &filter, format)?;
        }

        Commands::Read { numbers } => {
            run_read(config, &numbers, format)?;
        }

        Commands::Unread { numbers } => {
            run_unread(config, &numbers, format)?;
        }

        Commands::State => {
            run_state(config, format)?;
        }

        Commands::Queries => {
            run_queries(config, format)?;
        }

        Commands::Pipeline { filter } => {
            run_pipeline(config, &filter, format)?;
        }

        Commands::Shell { filter } => {
            run_shell(config, &filter, format)?;
        }
    }

    Ok(())
}
