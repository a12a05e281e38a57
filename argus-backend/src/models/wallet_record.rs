use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored provisioning state for one end user.
///
/// `agent_key` is the raw hex private key of the agent. It never leaves the
/// signing path; use `WalletInfo` for anything caller-facing.
#[derive(Clone)]
pub struct WalletRecord {
    pub user_address: Address,
    pub wallet_address: Address,
    pub delegate_module_address: Option<Address>,
    pub agent_address: Address,
    pub agent_key: String,
    pub ownership_transferred: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("user_address", &self.user_address)
            .field("wallet_address", &self.wallet_address)
            .field("delegate_module_address", &self.delegate_module_address)
            .field("agent_address", &self.agent_address)
            .field("agent_key", &"<redacted>")
            .field("ownership_transferred", &self.ownership_transferred)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl WalletRecord {
    pub fn info(&self) -> WalletInfo {
        WalletInfo {
            user_address: self.user_address,
            wallet_address: self.wallet_address,
            delegate_module_address: self.delegate_module_address,
            agent_address: self.agent_address,
            ownership_transferred: self.ownership_transferred,
            created_at: self.created_at,
        }
    }
}

/// Public projection of a `WalletRecord` (no secret fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub user_address: Address,
    pub wallet_address: Address,
    pub delegate_module_address: Option<Address>,
    pub agent_address: Address,
    pub ownership_transferred: bool,
    pub created_at: DateTime<Utc>,
}
