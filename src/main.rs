use clap::{Parser, Subcommand};
use crescendo::adapters::MetricsApiClient;
use crescendo::api::{self, AppState};
use crescendo::config::AppConfig;
use crescendo::engine::{DailyScoringJob, RolloverJob};
use crescendo::error::{CrescendoError, Result};
use crescendo::PostgresStore;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crescendo", about = "Fantasy music league scoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the scheduler trigger endpoints (default)
    Serve,
    /// Run one daily scoring pass and exit
    Score,
    /// Run the weekly rollover and exit
    Rollover,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = AppConfig::load()?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config: {}", e);
        }
        return Err(CrescendoError::ConfigValidation(errors.join("; ")));
    }

    let store = PostgresStore::new(
        &config.database.url,
        config.database.max_connections,
        config.database.page_size,
    )
    .await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            store.migrate().await?;
            let provider = Arc::new(MetricsApiClient::new(config.provider.clone())?);
            let port = config.server.port;
            let state = Arc::new(AppState::new(store, provider, config));

            tokio::select! {
                result = api::serve(state, port) => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                }
            }
        }
        Commands::Score => {
            let provider = Arc::new(MetricsApiClient::new(config.provider.clone())?);
            let job = DailyScoringJob::new(store, provider, config);
            let summary = job.run().await?;
            info!(
                "Scoring run complete: {} artists scored, {} managers updated, {} wagers resolved in {}ms",
                summary.artists_scored,
                summary.managers_updated,
                summary.wagers_resolved,
                summary.duration_ms
            );
        }
        Commands::Rollover => {
            let job = RolloverJob::new(store);
            let summary = job.run().await?;
            info!(
                "Rollover complete: season {} closed, {} managers ranked",
                summary.season_id, summary.managers_ranked
            );
        }
        Commands::Migrate => {
            store.migrate().await?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,crescendo=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
