use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shelfscan::app::AppContext;
use shelfscan::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shelfscan=info")))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.config, cli.output_dir)?;

    match cli.command {
        Commands::Run { retailer } => {
            let summary = commands::run_scrapers(&ctx, retailer.as_deref()).await?;
            if !summary.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List => {
            commands::list_retailers(&ctx)?;
        }
        Commands::Latest { retailer } => {
            commands::print_latest(&ctx, &retailer)?;
        }
        Commands::Report { retailer } => {
            commands::report(&ctx, &retailer)?;
        }
        Commands::Export { retailer, out } => {
            commands::export(&ctx, &retailer, out)?;
        }
        Commands::Schedule {
            interval,
            no_initial_run,
        } => {
            commands::schedule(&ctx, &interval, no_initial_run).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
