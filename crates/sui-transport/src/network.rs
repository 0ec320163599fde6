use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

const MAINNET_RPC: &str = "https://fullnode.mainnet.sui.io:443";
const TESTNET_RPC: &str = "https://fullnode.testnet.sui.io:443";
const DEVNET_RPC: &str = "https://fullnode.devnet.sui.io:443";
const LOCALNET_RPC: &str = "http://127.0.0.1:9000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SuiNetwork {
    #[default]
    Mainnet,
    Testnet,
    Devnet,
    Localnet,
}

impl SuiNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuiNetwork::Mainnet => "mainnet",
            SuiNetwork::Testnet => "testnet",
            SuiNetwork::Devnet => "devnet",
            SuiNetwork::Localnet => "localnet",
        }
    }
}

impl fmt::Display for SuiNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuiNetwork {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(SuiNetwork::Mainnet),
            "testnet" => Ok(SuiNetwork::Testnet),
            "devnet" => Ok(SuiNetwork::Devnet),
            "localnet" | "local" => Ok(SuiNetwork::Localnet),
            other => Err(anyhow!("unknown Sui network '{}'", other)),
        }
    }
}

pub fn infer_network_from_url(url: &str) -> Option<SuiNetwork> {
    let lower = url.to_lowercase();
    if lower.contains("testnet") {
        Some(SuiNetwork::Testnet)
    } else if lower.contains("devnet") {
        Some(SuiNetwork::Devnet)
    } else if lower.contains("mainnet") {
        Some(SuiNetwork::Mainnet)
    } else if lower.contains("127.0.0.1") || lower.contains("localhost") {
        Some(SuiNetwork::Localnet)
    } else {
        None
    }
}

/// Network for an RPC URL, falling back to mainnet.
pub fn infer_network(rpc_url: &str) -> SuiNetwork {
    infer_network_from_url(rpc_url).unwrap_or_default()
}

pub fn rpc_url_for(network: SuiNetwork) -> &'static str {
    match network {
        SuiNetwork::Mainnet => MAINNET_RPC,
        SuiNetwork::Testnet => TESTNET_RPC,
        SuiNetwork::Devnet => DEVNET_RPC,
        SuiNetwork::Localnet => LOCALNET_RPC,
    }
}

/// Resolve the RPC endpoint: an explicit URL wins, then `SUI_RPC_URL`, then
/// the default fullnode for `network`.
pub fn resolve_rpc_url(explicit: Option<&str>, network: SuiNetwork) -> String {
    if let Some(url) = explicit.filter(|u| !u.trim().is_empty()) {
        return url.trim().to_string();
    }
    if let Ok(value) = std::env::var("SUI_RPC_URL") {
        if !value.trim().is_empty() {
            return value.trim().to_string();
        }
    }
    rpc_url_for(network).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_network() {
        assert_eq!(infer_network(TESTNET_RPC), SuiNetwork::Testnet);
        assert_eq!(infer_network("http://localhost:9000"), SuiNetwork::Localnet);
        assert_eq!(infer_network("https://rpc.example.com"), SuiNetwork::Mainnet);
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("Devnet".parse::<SuiNetwork>().unwrap(), SuiNetwork::Devnet);
        assert!("moonnet".parse::<SuiNetwork>().is_err());
    }

    #[test]
    fn test_explicit_rpc_url_wins() {
        assert_eq!(
            resolve_rpc_url(Some(" http://node:9000 "), SuiNetwork::Mainnet),
            "http://node:9000"
        );
    }
}
