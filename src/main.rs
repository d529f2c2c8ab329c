use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use perp_valuation::domain::{BlockHeight, TimeRange};
use perp_valuation::engine::{Pagination, PnlQuery, PnlResolution};
use perp_valuation::reference::spawn_refresher;
use perp_valuation::{
    config::Config, db::init_db, Address, LedgerStore, ReferenceCache, Repository,
    ServiceSettings, ValuationService,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "perp-valuation")]
#[command(about = "Value perpetual subaccounts and roll up their PnL history from indexed ledger rows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Current equity, free collateral and positions of a subaccount
    Subaccount {
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "0")]
        number: u32,
    },

    /// Historical PnL of a subaccount
    Pnl {
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "0")]
        number: u32,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Historical PnL summed over a parent subaccount's children
    ParentPnl {
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "0")]
        parent: u32,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Pooled and per-market PnL of the configured vaults
    VaultsPnl {
        #[arg(long, default_value = "hourly")]
        resolution: PnlResolution,
    },

    /// Keep the reference snapshot refreshed until interrupted
    Watch,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long, default_value = "hourly")]
    resolution: PnlResolution,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
    /// RFC3339 lower bound on tick creation time (inclusive)
    #[arg(long)]
    created_on_or_after: Option<DateTime<Utc>>,
    /// RFC3339 upper bound on tick creation time (inclusive)
    #[arg(long)]
    created_before_or_at: Option<DateTime<Utc>>,
    #[arg(long)]
    created_on_or_after_height: Option<u64>,
    #[arg(long)]
    created_before_or_at_height: Option<u64>,
}

impl From<QueryArgs> for PnlQuery {
    fn from(args: QueryArgs) -> Self {
        PnlQuery {
            range: TimeRange {
                created_on_or_after: args.created_on_or_after,
                created_before_or_at: args.created_before_or_at,
                created_on_or_after_height: args.created_on_or_after_height.map(BlockHeight::new),
                created_before_or_at_height: args.created_before_or_at_height.map(BlockHeight::new),
            },
            resolution: args.resolution,
            pagination: Pagination {
                page: args.page,
                limit: args.limit,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Configuration error")?;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("Failed to open ledger database {}", config.database_path))?;
    let store: Arc<dyn LedgerStore> = Arc::new(Repository::new(pool));
    let cache = Arc::new(ReferenceCache::default());

    if let Commands::Watch = cli.command {
        return watch_reference(cache, store, &config).await;
    }

    cache
        .refresh(store.as_ref())
        .await
        .context("Failed to load markets and liquidity tiers")?;
    let service = ValuationService::new(store, cache, ServiceSettings::from(&config));

    match cli.command {
        Commands::Subaccount { address, number } => {
            print_json(&service.subaccount_state(&Address::new(address), number).await?)
        }
        Commands::Pnl {
            address,
            number,
            query,
        } => print_json(
            &service
                .historical_pnl(&Address::new(address), number, query.into())
                .await?,
        ),
        Commands::ParentPnl {
            address,
            parent,
            query,
        } => print_json(
            &service
                .parent_historical_pnl(&Address::new(address), parent, query.into())
                .await?,
        ),
        Commands::VaultsPnl { resolution } => {
            print_json(&service.vaults_historical_pnl(resolution).await?)
        }
        Commands::Watch => Ok(()),
    }
}

async fn watch_reference(
    cache: Arc<ReferenceCache>,
    store: Arc<dyn LedgerStore>,
    config: &Config,
) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = spawn_refresher(cache, store, config.reference_refresh_interval, shutdown_rx);
    info!(
        interval_ms = config.reference_refresh_interval.as_millis() as u64,
        "Refreshing reference data; Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    shutdown_tx.send(true).ok();
    handle.await.context("Refresher task panicked")?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
