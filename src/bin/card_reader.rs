//! card-reader: query profile cards from a Sui registry through the cached read path.
//!
//! ## Example Usage
//!
//! ```bash
//! export CARD_PACKAGE_ID=0x... CARD_REGISTRY_ID=0x... CARD_REGISTRY_VERSION=42
//!
//! card-reader count
//! card-reader card 7 --refresh
//! card-reader owner 0xabc...
//! card-reader search skill rust --min 3
//! card-reader --cache-dir ~/.cache/card-reader all
//! card-reader --cache-dir ~/.cache/card-reader cache clear-expired
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use card_reader_types::SuiAddress;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use sui_card_reader::args::{Args, CacheAction, Command};
use sui_card_reader::{CollectionOrchestrator, SearchQuery};
use sui_transport::JsonRpcInspectClient;
use sui_view_cache::{DurableStore, FsKvStorage, SystemClock};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sui_card_reader=info,warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_owner(raw: &str) -> Result<SuiAddress> {
    SuiAddress::parse(raw).ok_or_else(|| anyhow!("invalid address '{}'", raw))
}

/// Cache maintenance only needs the durable directory, not a registry.
fn run_cache_action(args: &Args, action: CacheAction) -> Result<()> {
    let dir = args
        .cache_dir
        .as_ref()
        .ok_or_else(|| anyhow!("--cache-dir (or CARD_CACHE_DIR) is required for cache commands"))?;
    let storage = FsKvStorage::with_quota(dir, args.cache_quota_bytes)
        .with_context(|| format!("opening cache directory {}", dir.display()))?;
    let store = DurableStore::new(
        storage,
        sui_card_reader::config::DEFAULT_CACHE_NAMESPACE,
        Arc::new(SystemClock),
    );
    let removed = match action {
        CacheAction::ClearExpired => store.clear_expired(),
        CacheAction::Clear => store.clear(),
    };
    info!(removed, dir = %dir.display(), "cache maintenance done");
    print_json(&json!({ "removed": removed }))
}

type Reader = CollectionOrchestrator<JsonRpcInspectClient>;

fn connect(args: &Args) -> Result<Reader> {
    let config = args.reader_config()?;
    info!(rpc = %config.rpc_url, network = %config.network(), "connecting");
    let client = JsonRpcInspectClient::new(&config.rpc_url);
    CollectionOrchestrator::from_config(client, config)
}

/// Run one query command. Returns the reader so its counters can be reported.
async fn run_query(args: &Args) -> Result<Reader> {
    let reader = connect(args)?;
    match &args.command {
        Command::Count { refresh } => {
            let total = reader.count(*refresh).await?;
            print_json(&json!({ "total_cards": total }))?;
        }
        Command::Card { id, refresh } => {
            let card = reader.fetcher().fetch_card(*id, *refresh).await?;
            print_json(&card)?;
        }
        Command::All { refresh } => {
            let outcome = reader.get_all_detailed(*refresh).await;
            if let Some(error) = &outcome.error {
                return Err(anyhow!("could not list cards: {}", error));
            }
            print_json(&outcome)?;
        }
        Command::Owner { address, refresh } => {
            let owner = parse_owner(address)?;
            let outcome = reader.get_user_cards_detailed(&owner, *refresh).await;
            print_json(&outcome)?;
        }
        Command::Search {
            kind,
            text,
            min,
            refresh,
        } => {
            let query = SearchQuery {
                kind: (*kind).into(),
                text: text.clone(),
                min_proficiency: *min,
            };
            let cards = reader.search(&query, *refresh).await?;
            print_json(&cards)?;
        }
        Command::Stats { refresh } => {
            let stats = reader.fetcher().platform_stats(*refresh).await?;
            print_json(&stats)?;
        }
        Command::Admin { address } => {
            let address = parse_owner(address)?;
            let is_admin = reader.fetcher().is_admin(&address, false).await?;
            print_json(&json!({ "address": address, "is_admin": is_admin }))?;
        }
        Command::Cache { action } => run_cache_action(args, *action)?,
    }
    Ok(reader)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if let Command::Cache { action } = &args.command {
        return run_cache_action(&args, *action);
    }

    let reader = run_query(&args).await?;
    if args.metrics {
        eprintln!("{}", reader.caches().metrics().snapshot().format_report());
    }
    let swept = reader.caches().clear_expired();
    if swept > 0 {
        info!(swept, "removed expired cache entries");
    }
    Ok(())
}
