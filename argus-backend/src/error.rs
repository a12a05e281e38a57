//! Error taxonomy shared by every component.
//!
//! Each variant is an explicit kind the caller can branch on; nothing in the
//! core retries or swallows these.

use ethers::types::{Address, H256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::provisioning::SeedingStep;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet found for {0:?}")]
    WalletNotFound(Address),

    #[error("user {0:?} already has a wallet")]
    DuplicateWallet(Address),

    /// A record exists but provisioning never attached the module
    #[error("wallet of {0:?} has no delegate module attached")]
    DelegateModuleMissing(Address),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown authorizer kind: {0}")]
    UnknownAuthorizerKind(String),

    #[error("agent mnemonic not configured (set AGENT_MNEMONIC)")]
    SeedNotConfigured,

    #[error("{event} event not found in receipt of {tx_hash:?}")]
    DeploymentEventNotFound { event: &'static str, tx_hash: H256 },

    #[error("transaction {0:?} reverted")]
    TransactionReverted(H256),

    /// The transaction was submitted but no receipt arrived in time.
    /// Its outcome is unknown, not failed.
    #[error("timed out waiting for receipt of {0:?}; outcome unknown")]
    RpcTimeout(H256),

    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParams { name: String, reason: String },

    /// The authorizer exists on-chain but its role was not wired; the
    /// agent cannot use it until the wiring batch is re-run.
    #[error("authorizer {authorizer:?} deployed but role wiring failed: {source}")]
    RoleWiringFailed {
        authorizer: Address,
        #[source]
        source: Box<WalletError>,
    },

    #[error("authorizer {authorizer:?} seeding failed at step {step}: {source}")]
    SeedingFailed {
        authorizer: Address,
        step: SeedingStep,
        #[source]
        source: Box<WalletError>,
    },

    #[error("provisioning stopped at {stage} ({progress}): {source}")]
    ProvisioningIncomplete {
        stage: ProvisioningStage,
        progress: Box<ProvisioningProgress>,
        #[source]
        source: Box<WalletError>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("abi error: {0}")]
    Abi(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl WalletError {
    /// Stable snake_case name of the error kind, for callers that report
    /// errors over a transport.
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::WalletNotFound(_) => "wallet_not_found",
            WalletError::DuplicateWallet(_) => "duplicate_wallet",
            WalletError::DelegateModuleMissing(_) => "delegate_module_missing",
            WalletError::UnknownAction(_) => "unknown_action",
            WalletError::UnknownAuthorizerKind(_) => "unknown_authorizer_kind",
            WalletError::SeedNotConfigured => "seed_not_configured",
            WalletError::DeploymentEventNotFound { .. } => "deployment_event_not_found",
            WalletError::TransactionReverted(_) => "transaction_reverted",
            WalletError::RpcTimeout(_) => "rpc_timeout",
            WalletError::RpcUnavailable(_) => "rpc_unavailable",
            WalletError::InvalidParams { .. } => "invalid_params",
            WalletError::RoleWiringFailed { .. } => "role_wiring_failed",
            WalletError::SeedingFailed { .. } => "seeding_failed",
            WalletError::ProvisioningIncomplete { .. } => "provisioning_incomplete",
            WalletError::Config(_) => "config",
            WalletError::Key(_) => "key",
            WalletError::Abi(_) => "abi",
            WalletError::Database(_) => "database",
            WalletError::Pool(_) => "database",
        }
    }

    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        WalletError::InvalidParams {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ethers::abi::Error> for WalletError {
    fn from(e: ethers::abi::Error) -> Self {
        WalletError::Abi(e.to_string())
    }
}

/// Step of `CreateWallet` that was running when provisioning stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStage {
    DeployWallet,
    RecordWallet,
    AttachDelegateModule,
    RecordDelegateModule,
    CreateAuthorizer(String),
    TransferOwnership,
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningStage::DeployWallet => write!(f, "deploy_wallet"),
            ProvisioningStage::RecordWallet => write!(f, "record_wallet"),
            ProvisioningStage::AttachDelegateModule => write!(f, "attach_delegate_module"),
            ProvisioningStage::RecordDelegateModule => write!(f, "record_delegate_module"),
            ProvisioningStage::CreateAuthorizer(kind) => write!(f, "create_authorizer:{}", kind),
            ProvisioningStage::TransferOwnership => write!(f, "transfer_ownership"),
        }
    }
}

/// On-chain state already committed when provisioning stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningProgress {
    pub wallet_address: Option<Address>,
    pub delegate_module_address: Option<Address>,
    /// Authorizer kind name -> deployed authorizer address
    pub authorizers: BTreeMap<String, Address>,
    pub ownership_transferred: bool,
}

impl fmt::Display for ProvisioningProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wallet = self
            .wallet_address
            .map(|a| format!("{:?}", a))
            .unwrap_or_else(|| "none".to_string());
        let module = self
            .delegate_module_address
            .map(|a| format!("{:?}", a))
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "wallet={} delegate_module={} authorizers={}",
            wallet,
            module,
            self.authorizers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_stable() {
        assert_eq!(WalletError::SeedNotConfigured.kind(), "seed_not_configured");
        assert_eq!(
            WalletError::UnknownAction("swap".to_string()).kind(),
            "unknown_action"
        );
        assert_eq!(
            WalletError::TransactionReverted(H256::zero()).kind(),
            "transaction_reverted"
        );
    }

    #[test]
    fn test_incomplete_provisioning_message_names_stage() {
        let err = WalletError::ProvisioningIncomplete {
            stage: ProvisioningStage::CreateAuthorizer("SiloAuthorizer".to_string()),
            progress: Box::new(ProvisioningProgress {
                wallet_address: Some(Address::repeat_byte(0x11)),
                ..Default::default()
            }),
            source: Box::new(WalletError::RpcUnavailable("connection refused".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("create_authorizer:SiloAuthorizer"));
        assert!(msg.contains("delegate_module=none"));
    }
}
