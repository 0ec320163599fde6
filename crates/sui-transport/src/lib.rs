//! Sui Transport Layer
//!
//! Network transport for Sui view-function reads.
//!
//! This crate provides:
//! - [`raw`]: the [`RawValue`] shapes a return value can arrive in
//! - [`inspect`]: view calls, parsed results and the [`InspectClient`] trait
//! - [`ptb`]: BCS encoding of a single-call programmable transaction
//! - [`jsonrpc`]: a `sui_devInspectTransactionBlock` client over HTTP
//! - [`network`]: network inference and default fullnode URLs
//!
//! # Example
//!
//! ```ignore
//! use sui_transport::{InspectClient, JsonRpcInspectClient, MoveTarget, ViewCall};
//!
//! let client = JsonRpcInspectClient::testnet();
//! let target: MoveTarget = "0x2::profile_card::get_total_cards".parse()?;
//! let result = client.inspect(&ViewCall::new(target, vec![])).await?;
//! ```

pub mod inspect;
pub mod jsonrpc;
pub mod network;
pub mod ptb;
pub mod raw;

pub use inspect::{
    parse_inspect_response, CallArg, InspectClient, InspectResult, MoveTarget, ReturnValue,
    ViewCall,
};
pub use jsonrpc::JsonRpcInspectClient;
pub use network::{infer_network, resolve_rpc_url, rpc_url_for, SuiNetwork};
pub use ptb::build_view_transaction;
pub use raw::RawValue;
