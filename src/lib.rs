//! Sui Card Reader
//!
//! The cached, batched on-chain read path for profile cards:
//!
//! - **Byte decoding**: normalize heterogeneous view-call return values ([`decode`])
//! - **Caching**: typed two-tier TTL caches with stale fallback ([`cache`])
//! - **Retries**: bounded exponential backoff around remote reads ([`utils`])
//! - **Entity reads**: one card, count, stats or admin role ([`fetcher`])
//! - **Collections**: batched full scans, owner views and search ([`orchestrator`])
//!
//! ```no_run
//! use sui_card_reader::{CollectionOrchestrator, ReaderConfig};
//! use sui_transport::JsonRpcInspectClient;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ReaderConfig::from_env()?;
//! let client = JsonRpcInspectClient::new(&config.rpc_url);
//! let reader = CollectionOrchestrator::from_config(client, config)?;
//! for card in reader.get_all(false).await {
//!     println!("{} {}", card.id, card.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod utils;

pub use cache::{CacheScope, CardCaches, SearchKey, SearchKind, SearchQuery};
pub use config::ReaderConfig;
pub use error::{is_cancelled, Cancelled, FetchError};
pub use fetcher::CardFetcher;
pub use orchestrator::{CollectionOrchestrator, CollectionOutcome};
pub use utils::{with_retries, with_retries_cancellable, with_retry_config};
