//! Authorizer deployment, role wiring and allow-list seeding.
//!
//! Flow for one authorizer:
//! 1. clone the implementation through the helper (Safe delegate-call)
//! 2. wire the role in a single MultiSend batch: addRoles, addAuthorizer, grantRoles
//! 3. seed the allow-lists, one transaction per step
//!
//! Seeding temporarily hands the list manager/admin role to the controller so
//! it can write the lists directly, then hands it to the end user.

use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;

use crate::abi::{self, argus_helper, authorizer, cobo_account, role_manager};
use crate::chain::events::{self, PROXY_CREATED};
use crate::config::{ContractAddresses, SeedLists};
use crate::error::WalletError;
use crate::tx::multisend::{self, BatchCall};
use crate::tx::signer::result_of;
use crate::tx::{Operation, TransactionResult, TransactionSigner};

use super::{AuthorizerKind, SeedingStep};

/// Tag = first 28 bytes of the implementation NAME followed by the block
/// number as 4 big-endian bytes.
pub fn compute_tag(name: &[u8; 32], block_number: u64) -> Result<[u8; 32], WalletError> {
    let block = u32::try_from(block_number).map_err(|_| {
        WalletError::invalid_param(
            "block_number",
            format!("{} does not fit the 4-byte tag suffix", block_number),
        )
    })?;

    let mut tag = [0u8; 32];
    tag[..28].copy_from_slice(&name[..28]);
    tag[28..].copy_from_slice(&block.to_be_bytes());
    Ok(tag)
}

/// Role name as a right-zero-padded bytes32
pub fn role_bytes(role: &str) -> Result<[u8; 32], WalletError> {
    let raw = role.as_bytes();
    if raw.is_empty() || raw.len() > 32 {
        return Err(WalletError::invalid_param("role", "must be 1 to 32 bytes"));
    }
    let mut word = [0u8; 32];
    word[..raw.len()].copy_from_slice(raw);
    Ok(word)
}

/// The three role-wiring sub-calls, in the order the module requires
pub fn role_wiring_calls(
    helper: Address,
    role_manager_address: Address,
    module: Address,
    authorizer_address: Address,
    role: [u8; 32],
    agent: Address,
) -> Vec<BatchCall> {
    let roles = abi::bytes32_array(&[role]);

    vec![
        BatchCall::call(
            role_manager_address,
            abi::encode_call(role_manager::ADD_ROLES, &[roles.clone()]),
        ),
        // Helper mutates the module's registry, so it runs in the Safe's context
        BatchCall::delegate_call(
            helper,
            abi::encode_call(
                argus_helper::ADD_AUTHORIZER,
                &[
                    Token::Address(module),
                    Token::Address(authorizer_address),
                    Token::Bool(false),
                    roles.clone(),
                ],
            ),
        ),
        BatchCall::delegate_call(
            helper,
            abi::encode_call(
                argus_helper::GRANT_ROLES,
                &[Token::Address(module), roles, abi::address_array(&[agent])],
            ),
        ),
    ]
}

pub struct AuthorizerProvisioner {
    signer: Arc<TransactionSigner>,
    contracts: ContractAddresses,
    seeds: SeedLists,
}

impl AuthorizerProvisioner {
    pub fn new(signer: Arc<TransactionSigner>, contracts: ContractAddresses, seeds: SeedLists) -> Self {
        Self { signer, contracts, seeds }
    }

    async fn read_name(&self, implementation: Address) -> Result<[u8; 32], WalletError> {
        let output = self
            .signer
            .chain()
            .call(implementation, abi::encode_call(authorizer::NAME, &[]))
            .await?;
        abi::decode_bytes32(&output)
    }

    pub async fn role_manager(&self, module: Address) -> Result<Address, WalletError> {
        let output = self
            .signer
            .chain()
            .call(module, abi::encode_call(cobo_account::ROLE_MANAGER, &[]))
            .await?;
        abi::decode_address(&output)
    }

    /// Deploy, wire and seed one authorizer for `module`
    pub async fn create_authorizer(
        &self,
        wallet: Address,
        module: Address,
        user: Address,
        agent: Address,
        kind: AuthorizerKind,
        role: &str,
    ) -> Result<Address, WalletError> {
        let role_word = role_bytes(role)?;
        let authorizer_address = self.deploy(wallet, module, kind).await?;

        self.wire_role(wallet, module, authorizer_address, role_word, agent)
            .await
            .map_err(|e| {
                log::warn!(
                    "[Authorizer] {} {:?} deployed but role wiring failed: {}",
                    kind,
                    authorizer_address,
                    e
                );
                WalletError::RoleWiringFailed {
                    authorizer: authorizer_address,
                    source: Box::new(e),
                }
            })?;

        self.seed(wallet, authorizer_address, user, kind, None).await?;

        log::info!(
            "[Authorizer] {} {} ready (role '{}', agent {:?})",
            kind,
            events::checksummed(&authorizer_address),
            role,
            agent
        );
        Ok(authorizer_address)
    }

    async fn deploy(&self, wallet: Address, module: Address, kind: AuthorizerKind) -> Result<Address, WalletError> {
        let implementation = kind.implementation(&self.contracts);
        let name = self.read_name(implementation).await?;
        let block_number = self.signer.chain().block_number().await?;
        let tag = compute_tag(&name, block_number)?;

        let data = abi::encode_call(
            argus_helper::CREATE_AUTHORIZER,
            &[
                Token::Address(self.contracts.cobo_factory),
                Token::Address(module),
                Token::FixedBytes(name.to_vec()),
                Token::FixedBytes(tag.to_vec()),
            ],
        );

        log::info!(
            "[Authorizer] Creating {} for module {:?} (tag 0x{})",
            kind,
            module,
            hex::encode(tag)
        );

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

        events::recover_address(&receipt, &PROXY_CREATED)
    }

    /// Register `role`, attach the authorizer to it and grant it to `agent`,
    /// as one MultiSend batch delegate-called by the Safe.
    pub async fn wire_role(
        &self,
        wallet: Address,
        module: Address,
        authorizer_address: Address,
        role: [u8; 32],
        agent: Address,
    ) -> Result<TransactionResult, WalletError> {
        let role_manager_address = self.role_manager(module).await?;
        let calls = role_wiring_calls(
            self.contracts.argus_helper,
            role_manager_address,
            module,
            authorizer_address,
            role,
            agent,
        );

        log::info!(
            "[Authorizer] Wiring role for {:?} via role manager {:?}",
            authorizer_address,
            role_manager_address
        );

        let receipt = self
            .signer
            .execute(
                wallet,
                self.contracts.multisend,
                multisend::encode_multisend(&calls),
                U256::zero(),
                Operation::DelegateCall,
            )
            .await?;
        result_of(&receipt).require_success()
    }

    /// Run the seeding sequence for `kind`, optionally resuming at `from`.
    /// Re-adding list entries is a no-op on the contracts, so re-running a
    /// step that already landed is safe.
    pub async fn seed(
        &self,
        wallet: Address,
        authorizer_address: Address,
        user: Address,
        kind: AuthorizerKind,
        from: Option<SeedingStep>,
    ) -> Result<(), WalletError> {
        let steps = kind.seeding_steps();
        let start = match from {
            None => 0,
            Some(step) => steps.iter().position(|s| *s == step).ok_or_else(|| {
                WalletError::invalid_param("step", format!("{} is not a seeding step of {}", step, kind))
            })?,
        };

        for step in &steps[start..] {
            log::info!("[Authorizer] Seeding {:?}: {}", authorizer_address, step);
            self.run_step(wallet, authorizer_address, user, *step)
                .await
                .map_err(|e| {
                    log::warn!("[Authorizer] Seeding {:?} stopped at {}: {}", authorizer_address, step, e);
                    WalletError::SeedingFailed {
                        authorizer: authorizer_address,
                        step: *step,
                        source: Box::new(e),
                    }
                })?;
        }
        Ok(())
    }

    async fn run_step(
        &self,
        wallet: Address,
        authorizer_address: Address,
        user: Address,
        step: SeedingStep,
    ) -> Result<TransactionResult, WalletError> {
        let controller = self.signer.controller_address();

        match step {
            SeedingStep::SetManagerToController => {
                self.via_wallet(wallet, authorizer_address, authorizer::SET_APPROVE_LIST_MANAGER, controller)
                    .await
            }
            SeedingStep::SetManagerToUser => {
                self.via_wallet(wallet, authorizer_address, authorizer::SET_APPROVE_LIST_MANAGER, user)
                    .await
            }
            SeedingStep::SetAdminToController => {
                self.via_wallet(wallet, authorizer_address, authorizer::SET_ADMIN, controller)
                    .await
            }
            SeedingStep::SetAdminToUser => {
                self.via_wallet(wallet, authorizer_address, authorizer::SET_ADMIN, user).await
            }
            SeedingStep::AddContracts => {
                self.from_controller(authorizer_address, authorizer::ADD_CONTRACTS, &self.seeds.contracts)
                    .await
            }
            SeedingStep::AddSpenders => {
                self.from_controller(authorizer_address, authorizer::ADD_SPENDERS, &self.seeds.spenders)
                    .await
            }
            SeedingStep::AddMarkets => {
                self.from_controller(authorizer_address, authorizer::ADD_POOL_ADDRESSES, &self.seeds.silos)
                    .await
            }
        }
    }

    /// Role handover, executed by the Safe as the authorizer's owner
    async fn via_wallet(
        &self,
        wallet: Address,
        authorizer_address: Address,
        signature: &str,
        account: Address,
    ) -> Result<TransactionResult, WalletError> {
        let data = abi::encode_call(signature, &[Token::Address(account)]);
        let receipt = self
            .signer
            .execute(wallet, authorizer_address, data, U256::zero(), Operation::Call)
            .await?;
        result_of(&receipt).require_success()
    }

    /// List write, sent directly by the controller while it holds the manager role
    async fn from_controller(
        &self,
        authorizer_address: Address,
        signature: &str,
        entries: &[Address],
    ) -> Result<TransactionResult, WalletError> {
        let data: Bytes = abi::encode_call(signature, &[abi::address_array(entries)]);
        let receipt = self
            .signer
            .send_from_controller(authorizer_address, data, self.signer.gas().wallet_exec)
            .await?;
        result_of(&receipt).require_success()
    }
}
