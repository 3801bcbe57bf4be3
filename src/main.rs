mod config;
mod export;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;
use crate::export::export_properties;
use crate::loader::{load_wards, snapshot_stats};
use crate::pipeline::Pipeline;
use crate::storage::SnapshotStore;

#[derive(Parser)]
#[command(name = "lra-scraper", about = "St. Louis LRA owned-property scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl a fixed list of wards concurrently, saving one snapshot per ward
    Crawl {
        /// Wards to crawl (default: pipeline.wards from config)
        #[arg(short, long = "ward", value_name = "N")]
        wards: Vec<u32>,
    },

    /// Load saved ward snapshots, flatten permits and write the CSV export
    Aggregate,

    /// Crawl wards 1, 2, … until one is empty, then export directly
    Discover,

    /// Summarise the ward snapshots on disk
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "lra_scraper=info,warn",
        1 => "lra_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Crawl { wards } => {
            let _t = utils::Timer::start("Ward crawl");
            let wards = if wards.is_empty() { config.pipeline.wards.clone() } else { wards };
            let store = SnapshotStore::open(&config.storage.snapshot_dir)?;

            let stats = Pipeline::new(&config)?
                .run_wards(&wards, move |ward, props| store.save_ward(ward, props).map(|_| ()))
                .await?;

            if stats.errors > 0 {
                bail!("{} of {} wards failed", stats.errors, wards.len());
            }
        }

        Command::Aggregate => {
            let _t = utils::Timer::start("Aggregate export");
            let store = SnapshotStore::open(&config.storage.snapshot_dir)?;
            let rows = load_wards(&store, &config.storage.aggregate_wards)?;
            export_properties(&config.storage.export_path, &rows)?;
        }

        Command::Discover => {
            let _t = utils::Timer::start("Ward discovery");
            let export_path = config.storage.export_path.clone();
            let stats = Pipeline::new(&config)?
                .discover(|rows| export_properties(&export_path, &rows).map(|_| ()))
                .await?;
            info!(
                "Done: {} wards, {} properties",
                stats.wards_processed, stats.properties_found
            );
        }

        Command::Stats => {
            let store = SnapshotStore::open(&config.storage.snapshot_dir)?;
            let wards = snapshot_stats(&store)?;
            if wards.is_empty() {
                println!("No snapshots in {:?} — run `lra-scraper crawl` first.", store.dir());
                return Ok(());
            }

            let total: usize = wards.iter().map(|w| w.properties).sum();
            let permits: usize = wards.iter().map(|w| w.permits).sum();
            let max_permits = wards.iter().map(|w| w.max_permits).max().unwrap_or(0);

            println!("─────────────────────────────────");
            println!("  LRA Scraper — Snapshot Stats");
            println!("─────────────────────────────────");
            for w in &wards {
                println!(
                    "  Ward {:>2} : {:>6} properties, {:>6} permits",
                    w.ward,
                    utils::fmt_count(w.properties),
                    utils::fmt_count(w.permits)
                );
            }
            println!("─────────────────────────────────");
            println!("  Wards       : {}", wards.len());
            println!("  Properties  : {}", utils::fmt_count(total));
            println!("  Permits     : {}", utils::fmt_count(permits));
            println!("  Max/parcel  : {}", max_permits);
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}
