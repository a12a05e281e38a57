//! On-chain provisioning: Safe deployment, Argus delegate module, authorizers.
//!
//! Every step is its own transaction and depends on the confirmed result of
//! the previous one; nothing here is rolled back on failure.

pub mod argus;
pub mod authorizers;
pub mod safe_factory;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::ContractAddresses;
use crate::error::WalletError;

pub use argus::DelegateModuleProvisioner;
pub use authorizers::AuthorizerProvisioner;
pub use safe_factory::WalletProvisioner;

/// Authorizer implementations that can be cloned for a delegate module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum AuthorizerKind {
    /// Token approvals restricted to listed tokens and spenders
    ApproveAuthorizerV2,
    /// Silo market actions restricted to listed pools
    SiloAuthorizer,
}

impl AuthorizerKind {
    pub fn parse(name: &str) -> Result<Self, WalletError> {
        name.parse()
            .map_err(|_| WalletError::UnknownAuthorizerKind(name.to_string()))
    }

    /// Implementation contract the authorizer proxy points at
    pub fn implementation(self, contracts: &ContractAddresses) -> Address {
        match self {
            AuthorizerKind::ApproveAuthorizerV2 => contracts.approve_authorizer_impl,
            AuthorizerKind::SiloAuthorizer => contracts.silo_authorizer_impl,
        }
    }

    /// Role name the authorizer is bound to by default
    pub fn default_role(self) -> &'static str {
        match self {
            AuthorizerKind::ApproveAuthorizerV2 => "approve",
            AuthorizerKind::SiloAuthorizer => "silo",
        }
    }

    /// Ordered allow-list seeding sequence for this kind
    pub fn seeding_steps(self) -> &'static [SeedingStep] {
        match self {
            AuthorizerKind::ApproveAuthorizerV2 => &[
                SeedingStep::SetManagerToController,
                SeedingStep::AddContracts,
                SeedingStep::AddSpenders,
                SeedingStep::SetManagerToUser,
            ],
            AuthorizerKind::SiloAuthorizer => &[
                SeedingStep::SetAdminToController,
                SeedingStep::AddMarkets,
                SeedingStep::SetAdminToUser,
            ],
        }
    }
}

/// One non-atomic seeding transaction of an authorizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SeedingStep {
    SetManagerToController,
    AddContracts,
    AddSpenders,
    SetManagerToUser,
    SetAdminToController,
    AddMarkets,
    SetAdminToUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        assert_eq!(AuthorizerKind::parse("SiloAuthorizer").unwrap(), AuthorizerKind::SiloAuthorizer);
        assert_eq!(AuthorizerKind::ApproveAuthorizerV2.to_string(), "ApproveAuthorizerV2");
        assert!(matches!(
            AuthorizerKind::parse("TransferAuthorizer"),
            Err(WalletError::UnknownAuthorizerKind(_))
        ));
    }

    #[test]
    fn test_seeding_steps_hand_control_back_last() {
        for kind in [AuthorizerKind::ApproveAuthorizerV2, AuthorizerKind::SiloAuthorizer] {
            let steps = kind.seeding_steps();
            assert!(matches!(
                steps.last(),
                Some(SeedingStep::SetManagerToUser) | Some(SeedingStep::SetAdminToUser)
            ));
        }
        assert_eq!("add_markets".parse::<SeedingStep>().unwrap(), SeedingStep::AddMarkets);
    }
}
