use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use card_reader_types::{RetryConfig, SuiAddress};
use clap::{Parser, Subcommand, ValueEnum};
use sui_transport::{resolve_rpc_url, SuiNetwork};

use crate::config::{ReaderConfig, DEFAULT_CACHE_QUOTA_BYTES, DEFAULT_CHUNK_SIZE, DEFAULT_MODULE};
use crate::orchestrator::SearchKind;

#[derive(Debug, Parser)]
#[command(
    name = "card-reader",
    author,
    version,
    about = "Cached, batched reads of on-chain profile cards"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Fullnode JSON-RPC endpoint (defaults to the network's public fullnode).
    #[arg(long, global = true, env = "SUI_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Network used when no RPC URL is given.
    #[arg(long, global = true, value_enum, default_value_t = NetworkArg::Mainnet)]
    pub network: NetworkArg,

    /// Package that publishes the card registry module.
    #[arg(long, global = true, env = "CARD_PACKAGE_ID", value_name = "ID")]
    pub package_id: Option<String>,

    /// Shared registry object id.
    #[arg(long, global = true, env = "CARD_REGISTRY_ID", value_name = "ID")]
    pub registry_id: Option<String>,

    /// Initial shared version of the registry object.
    #[arg(long, global = true, env = "CARD_REGISTRY_VERSION")]
    pub registry_version: Option<u64>,

    #[arg(long, global = true, env = "CARD_MODULE", default_value = DEFAULT_MODULE)]
    pub module: String,

    /// Persist cached reads under this directory between runs.
    #[arg(long, global = true, env = "CARD_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "CARD_CACHE_QUOTA_BYTES", default_value_t = DEFAULT_CACHE_QUOTA_BYTES)]
    pub cache_quota_bytes: u64,

    /// Retries per remote call after the first attempt.
    #[arg(long, global = true, default_value_t = 3)]
    pub retries: usize,

    #[arg(long, global = true, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Print cache hit/miss counters to stderr on exit.
    #[arg(long, global = true, default_value_t = false)]
    pub metrics: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Total number of cards in the registry
    Count {
        #[arg(long)]
        refresh: bool,
    },
    /// One card by id
    Card {
        id: u64,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// Every card, sorted by id
    All {
        #[arg(long)]
        refresh: bool,
    },
    /// Cards owned by an address
    Owner {
        address: String,
        #[arg(long)]
        refresh: bool,
    },
    /// Cards matching a registry search
    Search {
        #[arg(value_enum)]
        kind: SearchKindArg,
        text: String,
        /// Minimum proficiency for skill searches
        #[arg(long, default_value_t = 0)]
        min: u8,
        #[arg(long)]
        refresh: bool,
    },
    /// Registry-wide totals
    Stats {
        #[arg(long)]
        refresh: bool,
    },
    /// Whether an address holds the admin role
    Admin { address: String },
    /// Maintain the durable cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Copy, Clone, Subcommand)]
pub enum CacheAction {
    /// Remove expired and unreadable entries
    ClearExpired,
    /// Remove every entry in the cache namespace
    Clear,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum NetworkArg {
    Mainnet,
    Testnet,
    Devnet,
    Localnet,
}

impl From<NetworkArg> for SuiNetwork {
    fn from(value: NetworkArg) -> Self {
        match value {
            NetworkArg::Mainnet => SuiNetwork::Mainnet,
            NetworkArg::Testnet => SuiNetwork::Testnet,
            NetworkArg::Devnet => SuiNetwork::Devnet,
            NetworkArg::Localnet => SuiNetwork::Localnet,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum SearchKindArg {
    Skill,
    Location,
    WorkType,
    Niche,
}

impl From<SearchKindArg> for SearchKind {
    fn from(value: SearchKindArg) -> Self {
        match value {
            SearchKindArg::Skill => SearchKind::Skill,
            SearchKindArg::Location => SearchKind::Location,
            SearchKindArg::WorkType => SearchKind::WorkType,
            SearchKindArg::Niche => SearchKind::Niche,
        }
    }
}

impl Args {
    /// Reader configuration for commands that talk to the chain.
    pub fn reader_config(&self) -> Result<ReaderConfig> {
        let package_id = parse_address(self.package_id.as_deref(), "--package-id")?;
        let registry_id = parse_address(self.registry_id.as_deref(), "--registry-id")?;
        let version = self
            .registry_version
            .ok_or_else(|| anyhow!("--registry-version (or CARD_REGISTRY_VERSION) is required"))?;
        let rpc_url = resolve_rpc_url(self.rpc_url.as_deref(), self.network.into());

        let mut config = ReaderConfig::new(&rpc_url, package_id, registry_id, version);
        config.module = self.module.clone();
        config.chunk_size = self.chunk_size;
        config.retry = RetryConfig {
            retries: self.retries,
            ..RetryConfig::default()
        };
        config.cache_dir = self.cache_dir.clone();
        config.cache_quota_bytes = self.cache_quota_bytes;
        config.validate()?;
        Ok(config)
    }
}

fn parse_address(value: Option<&str>, flag: &str) -> Result<SuiAddress> {
    let raw = value.ok_or_else(|| anyhow!("{} is required", flag))?;
    SuiAddress::parse(raw).with_context(|| format!("{}: invalid address '{}'", flag, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let args = Args::try_parse_from([
            "card-reader",
            "--package-id",
            "0x2",
            "--registry-id",
            "0x5",
            "--registry-version",
            "3",
            "search",
            "work-type",
            "remote",
        ])
        .unwrap();
        match &args.command {
            Command::Search { kind, text, min, refresh } => {
                assert!(matches!(kind, SearchKindArg::WorkType));
                assert_eq!(text, "remote");
                assert_eq!(*min, 0);
                assert!(!refresh);
            }
            other => panic!("unexpected command {:?}", other),
        }
        let config = args.reader_config().unwrap();
        assert_eq!(config.registry_initial_version, 3);
        assert_eq!(config.chunk_size, 10);
    }

    #[test]
    fn test_missing_registry_is_an_error() {
        let args = Args::try_parse_from([
            "card-reader",
            "--package-id",
            "0x2",
            "--registry-version",
            "3",
            "count",
        ])
        .unwrap();
        if args.registry_id.is_none() {
            assert!(args.reader_config().is_err());
        }
    }

    #[test]
    fn test_cache_subcommand() {
        let args = Args::try_parse_from(["card-reader", "cache", "clear-expired"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Cache {
                action: CacheAction::ClearExpired
            }
        ));
    }
}
