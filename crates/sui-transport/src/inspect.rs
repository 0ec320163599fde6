//! View-function calls and the [`InspectClient`] seam.
//!
//! A view call executes a Move function without mutating state and returns
//! zero or more positional return values, each as a `(value, type-tag)` pair.
//! Everything above this module talks to the chain through [`InspectClient`],
//! which keeps the fetch and cache layers testable without a network.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use card_reader_types::SuiAddress;
use serde::Serialize;
use serde_json::Value;

use crate::raw::RawValue;

/// Fully-qualified Move function: `package::module::function`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoveTarget {
    pub package: SuiAddress,
    pub module: String,
    pub function: String,
}

impl MoveTarget {
    pub fn new(package: SuiAddress, module: &str, function: &str) -> Self {
        Self {
            package,
            module: module.to_string(),
            function: function.to_string(),
        }
    }
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.function)
    }
}

impl FromStr for MoveTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        let [package, module, function] = parts.as_slice() else {
            return Err(anyhow!("invalid Move target '{}': expected pkg::module::function", s));
        };
        let package = SuiAddress::parse(package)
            .ok_or_else(|| anyhow!("invalid package address in target '{}'", s))?;
        if module.is_empty() || function.is_empty() {
            return Err(anyhow!("invalid Move target '{}': empty module or function", s));
        }
        Ok(Self::new(package, module, function))
    }
}

/// One input to a view call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    /// BCS-encoded pure value.
    Pure(Vec<u8>),
    /// Shared object, always passed immutably to view functions.
    SharedObject {
        id: SuiAddress,
        initial_shared_version: u64,
    },
}

impl CallArg {
    /// BCS-encode a pure value.
    pub fn pure<T: Serialize>(value: &T) -> Result<Self> {
        let bytes = bcs::to_bytes(value).context("BCS encode pure argument")?;
        Ok(CallArg::Pure(bytes))
    }

    pub fn u64(value: u64) -> Self {
        CallArg::Pure(value.to_le_bytes().to_vec())
    }

    pub fn address(addr: &SuiAddress) -> Self {
        CallArg::Pure(addr.to_bytes().to_vec())
    }
}

/// A single view-function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewCall {
    pub target: MoveTarget,
    pub args: Vec<CallArg>,
}

impl ViewCall {
    pub fn new(target: MoveTarget, args: Vec<CallArg>) -> Self {
        Self { target, args }
    }
}

/// One positional return value with its Move type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnValue {
    pub value: RawValue,
    pub type_tag: String,
}

/// Normalized result of a view call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectResult {
    pub return_values: Vec<ReturnValue>,
}

impl InspectResult {
    pub fn from_values(values: Vec<RawValue>) -> Self {
        Self {
            return_values: values
                .into_iter()
                .map(|value| ReturnValue {
                    value,
                    type_tag: String::new(),
                })
                .collect(),
        }
    }

    /// The `index`-th return value, or [`RawValue::Null`] when absent.
    pub fn value(&self, index: usize) -> &RawValue {
        static NULL: RawValue = RawValue::Null;
        self.return_values
            .get(index)
            .map(|rv| &rv.value)
            .unwrap_or(&NULL)
    }

    pub fn is_empty(&self) -> bool {
        self.return_values.is_empty()
    }
}

/// The remote read call.
#[async_trait]
pub trait InspectClient: Send + Sync {
    /// Execute a view function and return its positional return values.
    ///
    /// Transport and execution failures are errors. An empty or missing
    /// `results`/`returnValues` is an empty [`InspectResult`], not an error.
    async fn inspect(&self, call: &ViewCall) -> Result<InspectResult>;
}

/// Parse a dev-inspect `result` object into an [`InspectResult`].
///
/// Accepts `returnValues` entries as `[value, typeTag]` pairs or as bare values.
pub fn parse_inspect_response(result: &Value) -> Result<InspectResult> {
    if let Some(error) = result.get("error").and_then(Value::as_str) {
        if !error.is_empty() {
            return Err(anyhow!("view call aborted: {}", error));
        }
    }

    let Some(first) = result
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
    else {
        return Ok(InspectResult::default());
    };

    let Some(values) = first.get("returnValues").and_then(Value::as_array) else {
        return Ok(InspectResult::default());
    };

    let return_values = values
        .iter()
        .map(|entry| match entry.as_array().map(Vec::as_slice) {
            Some([value, Value::String(tag)]) => ReturnValue {
                value: RawValue::from_json(value),
                type_tag: tag.clone(),
            },
            _ => ReturnValue {
                value: RawValue::from_json(entry),
                type_tag: String::new(),
            },
        })
        .collect();

    Ok(InspectResult { return_values })
}
