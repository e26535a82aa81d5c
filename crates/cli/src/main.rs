//! Mercato CLI - Database migrations, fixtures and order audits.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mercato migrate
//!
//! # Load stores, customers and products from a fixture
//! mercato seed crates/cli/fixtures/demo.yaml
//!
//! # Compare declared totals with the sales ledger
//! mercato orders audit --store 1 --order 42
//! ```
//!
//! All commands read the same environment as `mercato-api`
//! (`MERCATO_DATABASE_URL`, pool settings, `.env`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mercato")]
#[command(author, version, about = "Mercato CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed stores, customers and products from a YAML fixture
    Seed {
        /// Path to the fixture file
        file: String,
    },
    /// Inspect orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Compare declared totals with recorded sales
    Audit {
        /// Store to audit
        #[arg(short, long)]
        store: i32,

        /// Single order to audit (default: the store's recent orders)
        #[arg(short, long)]
        order: Option<i32>,

        /// Number of recent orders to audit
        #[arg(short, long, default_value_t = 100)]
        limit: i64,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Orders { action } => match action {
            OrdersAction::Audit {
                store,
                order,
                limit,
            } => commands::orders::audit(store, order, limit).await?,
        },
    }
    Ok(())
}
