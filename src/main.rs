use std::fs::File;
use std::io::{self, BufWriter};

use clap::Parser;
use fuel_trips::cli::{Cli, Command};
use fuel_trips::config::AppConfig;
use fuel_trips::{db, export, kafka, logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = AppConfig::load()?;

    // Init logging
    logging::init_logging(cli.verbosity_filter(), &config.log_level);

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    info!("Connected to database");

    match cli.command {
        Command::Consume => {
            info!("Starting Fuel Trips Service...");
            db::run_migrations(&pool).await?;
            kafka::start_kafka_consumer(&config, pool).await?;
        }
        Command::Stats { user } => {
            let mut conn = pool.acquire().await?;
            let stats = db::load_consumption_stats(&mut conn, user, config.stats_trip_window).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Active { user, limit } => {
            let mut conn = pool.acquire().await?;
            let active = db::load_active_trip(&mut conn, user, limit).await?;
            println!("{}", serde_json::to_string_pretty(&active)?);
        }
        Command::Export { user, output } => {
            let mut conn = pool.acquire().await?;
            let trips = db::fetch_all_trips(&mut conn, user).await?;
            match output {
                Some(path) => {
                    export::write_trips_csv(&trips, BufWriter::new(File::create(&path)?))?;
                    info!("Exported {} trips to {}", trips.len(), path.display());
                }
                None => export::write_trips_csv(&trips, io::stdout().lock())?,
            }
        }
    }

    Ok(())
}
