//! Reader configuration.
//!
//! A [`ReaderConfig`] names the card registry on chain and carries the read
//! path's tunables. Library users build one directly; the binary builds one
//! from CLI flags, which fall back to the same environment variables as
//! [`ReaderConfig::from_env`].

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use card_reader_types::{env_string_or, env_var, env_var_or, RetryConfig, SuiAddress, TtlPolicy};
use sui_transport::{infer_network, resolve_rpc_url, CallArg, MoveTarget, SuiNetwork};

pub const DEFAULT_MODULE: &str = "profile_card";
pub const DEFAULT_CHUNK_SIZE: usize = 10;
pub const DEFAULT_OWNER_SCAN_PARALLELISM: usize = 2;
pub const DEFAULT_CACHE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_CACHE_NAMESPACE: &str = "card_reader";

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub rpc_url: String,
    pub package_id: SuiAddress,
    pub module: String,
    /// Shared registry object passed as argument 0 to every view function.
    pub registry_id: SuiAddress,
    pub registry_initial_version: u64,
    /// IDs fetched concurrently per batch chunk.
    pub chunk_size: usize,
    /// Chunks in flight at once during owner scans.
    pub owner_scan_parallelism: usize,
    pub retry: RetryConfig,
    pub ttl: TtlPolicy,
    /// Directory for the durable tier. `None` keeps the cache in memory only.
    pub cache_dir: Option<PathBuf>,
    pub cache_quota_bytes: u64,
    pub cache_namespace: String,
}

impl ReaderConfig {
    pub fn new(
        rpc_url: &str,
        package_id: SuiAddress,
        registry_id: SuiAddress,
        registry_initial_version: u64,
    ) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            package_id,
            module: DEFAULT_MODULE.to_string(),
            registry_id,
            registry_initial_version,
            chunk_size: DEFAULT_CHUNK_SIZE,
            owner_scan_parallelism: DEFAULT_OWNER_SCAN_PARALLELISM,
            retry: RetryConfig::default(),
            ttl: TtlPolicy::default(),
            cache_dir: None,
            cache_quota_bytes: DEFAULT_CACHE_QUOTA_BYTES,
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
        }
    }

    /// Build from `CARD_PACKAGE_ID`, `CARD_REGISTRY_ID`, `CARD_REGISTRY_VERSION`
    /// and the optional `SUI_RPC_URL`, `CARD_MODULE`, `CARD_CACHE_DIR`,
    /// `CARD_CACHE_QUOTA_BYTES`.
    pub fn from_env() -> Result<Self> {
        let package_id = required_address("CARD_PACKAGE_ID")?;
        let registry_id = required_address("CARD_REGISTRY_ID")?;
        let version: u64 = env_var("CARD_REGISTRY_VERSION")
            .ok_or_else(|| anyhow!("CARD_REGISTRY_VERSION is not set or not a number"))?;
        let rpc_url = resolve_rpc_url(None, SuiNetwork::default());

        let mut config = Self::new(&rpc_url, package_id, registry_id, version);
        config.module = env_string_or("CARD_MODULE", DEFAULT_MODULE);
        config.cache_dir =
            env_var::<PathBuf>("CARD_CACHE_DIR").filter(|dir| !dir.as_os_str().is_empty());
        config.cache_quota_bytes = env_var_or("CARD_CACHE_QUOTA_BYTES", DEFAULT_CACHE_QUOTA_BYTES);
        Ok(config)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn network(&self) -> SuiNetwork {
        infer_network(&self.rpc_url)
    }

    /// `package::module::function` for one of the registry's view functions.
    pub fn target(&self, function: &str) -> MoveTarget {
        MoveTarget::new(self.package_id.clone(), &self.module, function)
    }

    pub fn registry_arg(&self) -> CallArg {
        CallArg::SharedObject {
            id: self.registry_id.clone(),
            initial_shared_version: self.registry_initial_version,
        }
    }

    /// Reject values that would make the orchestrator stall or spin.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(anyhow!("chunk_size must be at least 1"));
        }
        if self.owner_scan_parallelism == 0 {
            return Err(anyhow!("owner_scan_parallelism must be at least 1"));
        }
        if self.module.is_empty() {
            return Err(anyhow!("module name is empty"));
        }
        Ok(())
    }
}

fn required_address(key: &str) -> Result<SuiAddress> {
    let raw: String = env_var(key).ok_or_else(|| anyhow!("{} is not set", key))?;
    SuiAddress::parse(&raw).with_context(|| format!("{} is not a valid address: {}", key, raw))
}
