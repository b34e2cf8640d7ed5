//! Wardrobe CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! wd-cli migrate
//!
//! # Load products from a YAML catalog file
//! wd-cli seed --file catalog.yaml
//!
//! # Check a catalog file without touching the database
//! wd-cli seed --file catalog.yaml --dry-run
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert catalog products through the id sequence

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wd-cli")]
#[command(author, version, about = "Wardrobe CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the catalog file
        #[arg(short, long)]
        file: PathBuf,

        /// Validate the file only
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file, dry_run } => commands::seed::catalog(&file, dry_run).await?,
    }
    Ok(())
}
