//! Action dispatch.
//!
//! The action table is static: each symbolic action maps to one protocol
//! builder and method, with a hand-maintained parameter schema that is also
//! what gets published to the agent.

use ethers::signers::Signer;
use ethers::types::Address;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{crowdfunding, silo, token, ActionParams, ParamKind, ParamSpec, Protocol, WalletContext};
use crate::config::{parse_private_key, ProtocolAddresses};
use crate::error::WalletError;
use crate::models::WalletRecord;
use crate::tx::{CallData, TransactionResult, TransactionSigner};

#[derive(Debug)]
pub struct ActionHandler {
    pub action: &'static str,
    pub protocol: Protocol,
    pub method: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ActionHandler {
    /// Reject requests missing a required parameter before building anything
    pub fn validate(&self, params: &ActionParams) -> Result<(), WalletError> {
        for spec in self.params {
            if spec.required && !params.contains(spec) {
                return Err(WalletError::invalid_param(spec.name, "is required"));
            }
        }
        Ok(())
    }
}

pub static ACTIONS: &[ActionHandler] = &[
    ActionHandler {
        action: "approve",
        protocol: Protocol::Token,
        method: "approve",
        description: "Approve a spender to use tokens held by the wallet",
        params: &[token::TOKEN_ADDRESS, token::SPENDER_ADDRESS, token::AMOUNT],
    },
    ActionHandler {
        action: "silo_deposit",
        protocol: Protocol::Silo,
        method: "deposit",
        description: "Deposit the market asset into a Silo market",
        params: &[silo::SILO_ADDRESS, silo::AMOUNT],
    },
    ActionHandler {
        action: "silo_withdraw",
        protocol: Protocol::Silo,
        method: "withdraw",
        description: "Redeem Silo market shares back to the wallet",
        params: &[silo::SILO_ADDRESS, silo::AMOUNT],
    },
    ActionHandler {
        action: "silo_deposit_native",
        protocol: Protocol::Silo,
        method: "deposit_native",
        description: "Deposit native coin into a Silo market through the router",
        params: &[silo::SILO_ADDRESS, silo::AMOUNT],
    },
    ActionHandler {
        action: "crowdfunding_contribute",
        protocol: Protocol::Crowdfunding,
        method: "contribute",
        description: "Contribute to the crowdfunding campaign",
        params: &[crowdfunding::AMOUNT],
    },
];

fn no_aliases(aliases: &&'static [&'static str]) -> bool {
    aliases.is_empty()
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamDescription {
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
    #[serde(skip_serializing_if = "no_aliases")]
    pub aliases: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionDescription {
    pub description: &'static str,
    pub protocol: Protocol,
    pub params: BTreeMap<&'static str, ParamDescription>,
}

pub struct ActionDispatcher {
    signer: Arc<TransactionSigner>,
    protocols: ProtocolAddresses,
    markets: Vec<Address>,
    chain_id: u64,
}

impl ActionDispatcher {
    pub fn new(
        signer: Arc<TransactionSigner>,
        protocols: ProtocolAddresses,
        markets: Vec<Address>,
        chain_id: u64,
    ) -> Self {
        Self {
            signer,
            protocols,
            markets,
            chain_id,
        }
    }

    /// Pure lookup in the static table
    pub fn resolve(action: &str) -> Result<&'static ActionHandler, WalletError> {
        ACTIONS
            .iter()
            .find(|h| h.action == action)
            .ok_or_else(|| WalletError::UnknownAction(action.to_string()))
    }

    pub fn describe_all() -> BTreeMap<&'static str, ActionDescription> {
        ACTIONS
            .iter()
            .map(|h| {
                let params = h
                    .params
                    .iter()
                    .map(|p| {
                        (
                            p.name,
                            ParamDescription {
                                kind: p.kind,
                                required: p.required,
                                description: p.description,
                                aliases: p.aliases,
                            },
                        )
                    })
                    .collect();
                (
                    h.action,
                    ActionDescription {
                        description: h.description,
                        protocol: h.protocol,
                        params,
                    },
                )
            })
            .collect()
    }

    pub fn context_for(&self, record: &WalletRecord) -> Result<WalletContext, WalletError> {
        let delegate_module = record
            .delegate_module_address
            .ok_or(WalletError::DelegateModuleMissing(record.user_address))?;

        Ok(WalletContext {
            user: record.user_address,
            wallet: record.wallet_address,
            delegate_module,
            chain: self.signer.chain().clone(),
            protocols: self.protocols.clone(),
            markets: self.markets.clone(),
        })
    }

    /// Resolve and build without submitting
    pub async fn build(
        &self,
        record: &WalletRecord,
        action: &str,
        params: &ActionParams,
    ) -> Result<CallData, WalletError> {
        let handler = Self::resolve(action)?;
        handler.validate(params)?;

        let builder = handler.protocol.builder(self.context_for(record)?);
        log::debug!("[Dispatcher] {} -> {}.{}", action, builder.protocol(), handler.method);
        builder.build_transaction(handler.method, params).await
    }

    /// Build the call and execute it through the user's delegate module with
    /// the agent key. A reverted call comes back as a `Failed` result.
    pub async fn dispatch(
        &self,
        record: &WalletRecord,
        action: &str,
        params: &ActionParams,
    ) -> Result<TransactionResult, WalletError> {
        let call = self.build(record, action, params).await?;
        let module = record
            .delegate_module_address
            .ok_or(WalletError::DelegateModuleMissing(record.user_address))?;
        let agent = parse_private_key(&record.agent_key)?.with_chain_id(self.chain_id);

        log::info!(
            "[Dispatcher] {} for {:?} -> {:?}",
            action,
            record.user_address,
            call.to
        );
        self.signer.execute_via_module(module, &agent, &call).await
    }
}
