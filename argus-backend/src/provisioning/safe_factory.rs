//! Safe deployment and ownership handover.

use ethers::abi::Token;
use ethers::types::{Address, Bytes, H160, U256};
use std::sync::Arc;

use crate::abi::{self, safe, safe_factory};
use crate::chain::events::{self, PROXY_CREATION};
use crate::config::ContractAddresses;
use crate::error::WalletError;
use crate::tx::signer::result_of;
use crate::tx::{Operation, TransactionResult, TransactionSigner};

/// Head of the Safe owner linked list; `swapOwner` needs the predecessor of
/// the owner being replaced, and the single owner's predecessor is this sentinel.
pub const SENTINEL_OWNERS: Address = H160([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

pub struct WalletProvisioner {
    signer: Arc<TransactionSigner>,
    contracts: ContractAddresses,
}

/// `setup` payload for a 1-of-1 Safe owned by `owner`
pub fn setup_data(owner: Address, fallback_handler: Address) -> Bytes {
    abi::encode_call(
        safe::SETUP,
        &[
            abi::address_array(&[owner]),
            Token::Uint(U256::one()),        // threshold
            Token::Address(Address::zero()), // to
            Token::Bytes(Vec::new()),        // data
            Token::Address(fallback_handler),
            Token::Address(Address::zero()), // paymentToken
            Token::Uint(U256::zero()),       // payment
            Token::Address(Address::zero()), // paymentReceiver
        ],
    )
}

impl WalletProvisioner {
    pub fn new(signer: Arc<TransactionSigner>, contracts: ContractAddresses) -> Self {
        Self { signer, contracts }
    }

    /// Deploy a Safe owned by the controller; the address comes from the
    /// factory's `ProxyCreation` log.
    pub async fn create_from_controller(&self) -> Result<Address, WalletError> {
        let controller = self.signer.controller_address();
        let salt_nonce = self.signer.chain().block_number().await?;

        let data = abi::encode_call(
            safe_factory::CREATE_PROXY_WITH_NONCE,
            &[
                Token::Address(self.contracts.safe_singleton),
                Token::Bytes(setup_data(controller, self.contracts.fallback_handler).to_vec()),
                Token::Uint(U256::from(salt_nonce)),
            ],
        );

        log::info!(
            "[Safe] Deploying Safe for controller {:?} (salt nonce {})",
            controller,
            salt_nonce
        );

        let receipt = self
            .signer
            .send_from_controller(self.contracts.safe_factory, data, self.signer.gas().deploy)
            .await?;
        result_of(&receipt).require_success()?;

        let wallet = events::recover_address(&receipt, &PROXY_CREATION)?;
        log::info!("[Safe] Deployed Safe {}", events::checksummed(&wallet));
        Ok(wallet)
    }

    /// Replace the controller with `new_owner` as the Safe's sole owner
    pub async fn transfer_ownership(&self, wallet: Address, new_owner: Address) -> Result<TransactionResult, WalletError> {
        let controller = self.signer.controller_address();
        let data = abi::encode_call(
            safe::SWAP_OWNER,
            &[
                Token::Address(SENTINEL_OWNERS),
                Token::Address(controller),
                Token::Address(new_owner),
            ],
        );

        log::info!("[Safe] Transferring {:?} ownership {:?} -> {:?}", wallet, controller, new_owner);

        let receipt = self
            .signer
            .execute(wallet, wallet, data, U256::zero(), Operation::Call)
            .await?;
        result_of(&receipt).require_success()
    }
}
