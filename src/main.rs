use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::{Parser, Subcommand};
use property_scout::scrapers::ChromeSession;
use property_scout::{CollectError, Collector, Config, Db, PropertyCategory};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "property-scout", about = "Collect property listings from Zap Imóveis")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, env = "SCOUT_DB", default_value = "properties.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl one category and save the listings
    Collect {
        /// apartamento, casa, quitinete, sobrado, terreno or sitio
        #[arg(long)]
        category: PropertyCategory,

        /// Maximum number of listings to collect
        #[arg(long)]
        limit: usize,

        /// Also write the collected batch to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print every stored listing as JSON
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    let mut db = Db::open(&cli.db)
        .with_context(|| format!("opening database {}", cli.db.display()))?;
    db.init()?;

    match cli.command {
        Command::Collect {
            category,
            limit,
            output,
        } => {
            let browser_config = config.browser.clone();
            let collector = Collector::new(config);

            let cancel = collector.cancel_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current page");
                    cancel.store(true, Ordering::Relaxed);
                }
            });

            let result = collector
                .collect_data(
                    category,
                    limit,
                    move || ChromeSession::launch(&browser_config),
                    &mut db,
                )
                .await;

            let listings = match result {
                Ok(listings) => listings,
                Err(e @ (CollectError::NoData | CollectError::NoUniqueData)) => {
                    warn!("{}", e);
                    return Ok(ExitCode::from(2));
                }
                Err(e) => return Err(e.into()),
            };

            info!("Collected {} listings", listings.len());
            for (i, listing) in listings.iter().enumerate() {
                let price = listing
                    .price
                    .map(|p| format!("R$ {}", p))
                    .unwrap_or_else(|| "price on request".to_string());
                println!("{}. {} ({})", i + 1, listing.id, price);
                println!(
                    "   {} m², {} rooms, {} bathrooms, {} parking",
                    listing.area_m2, listing.rooms, listing.bathrooms, listing.vacancies
                );
                if let (Some(neighborhood), Some(region)) = (&listing.neighborhood, &listing.region)
                {
                    println!("   {}, {}", neighborhood, region);
                }
            }

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&listings)?;
                tokio::fs::write(&path, json).await?;
                info!("Saved listings to {}", path.display());
            }
        }
        Command::List => {
            let listings = db.all_listings()?;
            info!("{} listings stored", listings.len());
            println!("{}", serde_json::to_string_pretty(&listings)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
