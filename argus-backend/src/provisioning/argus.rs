//! Cobo Argus delegate module attachment.
//!
//! The Safe itself deploys the module: it delegate-calls `initArgus` on the
//! helper, which creates a CoboSafeAccount bound to the calling Safe and
//! enables it as a Safe module.

use ethers::abi::Token;
use ethers::types::{Address, U256};
use std::sync::Arc;

use crate::abi::{self, argus_helper};
use crate::chain::events::{self, ARGUS_INITIALIZED};
use crate::config::ContractAddresses;
use crate::error::WalletError;
use crate::tx::signer::result_of;
use crate::tx::{Operation, TransactionSigner};

/// Trailing byte of every Argus salt
const SALT_SUFFIX: u8 = 0x32;

/// `00 * 11 | user (20) | 0x32`, unique per user
pub fn argus_salt(user: Address) -> [u8; 32] {
    let mut salt = [0u8; 32];
    salt[11..31].copy_from_slice(user.as_bytes());
    salt[31] = SALT_SUFFIX;
    salt
}

pub struct DelegateModuleProvisioner {
    signer: Arc<TransactionSigner>,
    contracts: ContractAddresses,
}

impl DelegateModuleProvisioner {
    pub fn new(signer: Arc<TransactionSigner>, contracts: ContractAddresses) -> Self {
        Self { signer, contracts }
    }

    pub async fn attach_to_wallet(&self, wallet: Address, user: Address) -> Result<Address, WalletError> {
        let salt = argus_salt(user);
        let data = abi::encode_call(
            argus_helper::INIT_ARGUS,
            &[
                Token::Address(self.contracts.cobo_factory),
                Token::FixedBytes(salt.to_vec()),
            ],
        );

        log::info!(
            "[Argus] Initializing delegate module for Safe {:?} (salt 0x{})",
            wallet,
            hex::encode(salt)
        );

        // Module deployment runs inside the Safe call, so it gets the deployment gas limit
        let receipt = self
            .signer
            .execute_with_gas(
                wallet,
                self.contracts.argus_helper,
                data,
                U256::zero(),
                Operation::DelegateCall,
                self.signer.gas().deploy,
            )
            .await?;
        result_of(&receipt).require_success()?;

        let module = events::recover_address(&receipt, &ARGUS_INITIALIZED)?;
        log::info!("[Argus] Delegate module {} attached to {:?}", events::checksummed(&module), wallet);
        Ok(module)
    }
}
