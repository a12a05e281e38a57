//! Protocol call builders.
//!
//! A builder turns a method name plus loosely-typed parameters into the
//! `CallData` the delegate module executes. Builders never sign or submit;
//! the dispatcher hands their output to the `TransactionSigner`.

pub mod crowdfunding;
pub mod registry;
pub mod silo;
pub mod token;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::chain::ChainClient;
use crate::config::ProtocolAddresses;
use crate::error::WalletError;
use crate::tx::CallData;

pub use registry::ActionDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Protocol {
    Token,
    Silo,
    Crowdfunding,
}

impl Protocol {
    /// Builder for this protocol bound to one user's wallet
    pub fn builder(self, ctx: WalletContext) -> Box<dyn ProtocolCallBuilder> {
        match self {
            Protocol::Token => Box::new(token::TokenCallBuilder::new(ctx)),
            Protocol::Silo => Box::new(silo::SiloCallBuilder::new(ctx)),
            Protocol::Crowdfunding => Box::new(crowdfunding::CrowdfundingCallBuilder::new(ctx)),
        }
    }
}

/// Everything a builder may need about the wallet it acts for
#[derive(Clone)]
pub struct WalletContext {
    pub user: Address,
    pub wallet: Address,
    pub delegate_module: Address,
    pub chain: Arc<dyn ChainClient>,
    pub protocols: ProtocolAddresses,
    /// Silo markets reported by the APR helper
    pub markets: Vec<Address>,
}

#[async_trait]
pub trait ProtocolCallBuilder: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Build the call for `method`. Only reads chain state when the call
    /// cannot be built without it.
    async fn build_transaction(&self, method: &str, params: &ActionParams) -> Result<CallData, WalletError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParamKind {
    Address,
    Uint256,
}

impl ParamKind {
    /// JSON-schema type used when publishing the parameter
    pub fn json_type(self) -> &'static str {
        "string"
    }
}

/// Declared parameter of an action
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    /// Alternative keys accepted from callers
    pub aliases: &'static [&'static str],
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

/// Parameters of an action request, keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionParams(Map<String, Value>);

impl ActionParams {
    pub fn from_json(value: Value) -> Result<Self, WalletError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(WalletError::invalid_param(
                "params",
                format!("expected an object, got {}", other),
            )),
        }
    }

    fn lookup(&self, spec: &ParamSpec) -> Option<&Value> {
        std::iter::once(&spec.name)
            .chain(spec.aliases.iter())
            .find_map(|key| self.0.get(*key))
            .filter(|v| !v.is_null())
    }

    pub fn contains(&self, spec: &ParamSpec) -> bool {
        self.lookup(spec).is_some()
    }

    pub fn address(&self, spec: &ParamSpec) -> Result<Address, WalletError> {
        let value = self
            .lookup(spec)
            .ok_or_else(|| WalletError::invalid_param(spec.name, "is required"))?;
        let text = value
            .as_str()
            .ok_or_else(|| WalletError::invalid_param(spec.name, "must be a hex address string"))?;
        text.trim()
            .parse::<Address>()
            .map_err(|_| WalletError::invalid_param(spec.name, format!("'{}' is not a valid address", text)))
    }

    pub fn opt_u256(&self, spec: &ParamSpec) -> Result<Option<U256>, WalletError> {
        match self.lookup(spec) {
            None => Ok(None),
            Some(value) => parse_u256(spec.name, value).map(Some),
        }
    }

    pub fn u256(&self, spec: &ParamSpec) -> Result<U256, WalletError> {
        self.opt_u256(spec)?
            .ok_or_else(|| WalletError::invalid_param(spec.name, "is required"))
    }
}

/// Raw integer amounts: decimal or 0x-hex strings, or non-negative JSON integers
fn parse_u256(name: &str, value: &Value) -> Result<U256, WalletError> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x") {
                Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
                None => U256::from_dec_str(s).ok(),
            };
            parsed.ok_or_else(|| WalletError::invalid_param(name, format!("'{}' is not a raw integer amount", s)))
        }
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| WalletError::invalid_param(name, "must be a non-negative integer")),
        _ => Err(WalletError::invalid_param(name, "must be an integer or integer string")),
    }
}
