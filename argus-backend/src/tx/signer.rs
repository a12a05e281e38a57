//! TransactionSigner - the single submission path for state-changing calls.
//!
//! Three shapes of submission funnel through here:
//! - Safe execution: the Safe's own `getTransactionHash` is read, signed by the
//!   controller and passed to `execTransaction`, which the controller submits.
//! - Module execution: the agent key calls the delegate module's
//!   `execTransaction(CallData)` directly.
//! - Direct controller calls (factory deployments, allow-list seeding).
//!
//! Each signer address has its own async lock held across nonce fetch and
//! broadcast, so concurrent submissions from one key never share a nonce.

use dashmap::DashMap;
use ethers::abi::Token;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256, U64};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::abi::{self, cobo_account, safe};
use crate::chain::{ChainClient, TxRequest};
use crate::config::{Config, GasLimits};
use crate::error::WalletError;

use super::types::{CallData, Operation, TransactionResult, TxStatus};

/// Classify a receipt: status flag 1 is success, anything else failed
pub fn result_of(receipt: &TransactionReceipt) -> TransactionResult {
    let status = if receipt.status == Some(U64::from(1)) {
        TxStatus::Success
    } else {
        TxStatus::Failed
    };
    TransactionResult {
        tx_hash: receipt.transaction_hash,
        status,
    }
}

pub struct TransactionSigner {
    chain: Arc<dyn ChainClient>,
    controller: LocalWallet,
    gas: GasLimits,
    receipt_timeout: Duration,
    poll_interval: Duration,
    nonce_locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl TransactionSigner {
    pub fn new(chain: Arc<dyn ChainClient>, config: &Config) -> Self {
        Self {
            chain,
            controller: config.controller_key.clone(),
            gas: config.gas.clone(),
            receipt_timeout: config.receipt_timeout,
            poll_interval: config.receipt_poll_interval,
            nonce_locks: DashMap::new(),
        }
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    pub fn controller_address(&self) -> Address {
        self.controller.address()
    }

    pub fn gas(&self) -> &GasLimits {
        &self.gas
    }

    fn lock_for(&self, address: Address) -> Arc<Mutex<()>> {
        self.nonce_locks
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Sign and broadcast from `signer`, then wait for the receipt
    pub async fn send(
        &self,
        signer: &LocalWallet,
        to: Address,
        data: Bytes,
        value: U256,
        gas: u64,
    ) -> Result<TransactionReceipt, WalletError> {
        let from = signer.address();
        let tx_hash = {
            let lock = self.lock_for(from);
            let _guard = lock.lock().await;
            self.chain
                .send_transaction(signer, TxRequest { to, data, value, gas })
                .await?
        };

        log::info!("[Signer] Submitted {:?} from {:?} to {:?}", tx_hash, from, to);
        self.wait_for_receipt(tx_hash).await
    }

    /// Direct call from the controller key
    pub async fn send_from_controller(
        &self,
        to: Address,
        data: Bytes,
        gas: u64,
    ) -> Result<TransactionReceipt, WalletError> {
        self.send(&self.controller, to, data, U256::zero(), gas).await
    }

    /// Poll until the receipt appears. Past the deadline the outcome is
    /// unknown, so this returns `RpcTimeout` rather than a failed status.
    pub async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TransactionReceipt, WalletError> {
        let deadline = Instant::now() + self.receipt_timeout;

        loop {
            if let Some(receipt) = self.chain.transaction_receipt(tx_hash).await? {
                log::debug!("[Signer] Receipt for {:?}: status={:?}", tx_hash, receipt.status);
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "[Signer] No receipt for {:?} after {}s, outcome unknown",
                    tx_hash,
                    self.receipt_timeout.as_secs()
                );
                return Err(WalletError::RpcTimeout(tx_hash));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Read the Safe's canonical hash for a transaction at its current nonce
    pub async fn safe_transaction_hash(
        &self,
        wallet: Address,
        to: Address,
        data: &Bytes,
        value: U256,
        operation: Operation,
    ) -> Result<H256, WalletError> {
        let nonce = abi::decode_uint(&self.chain.call(wallet, abi::encode_call(safe::NONCE, &[])).await?)?;

        let hash_call = abi::encode_call(
            safe::GET_TRANSACTION_HASH,
            &[
                Token::Address(to),
                Token::Uint(value),
                Token::Bytes(data.to_vec()),
                Token::Uint(U256::from(operation.code())),
                Token::Uint(U256::zero()), // safeTxGas
                Token::Uint(U256::zero()), // baseGas
                Token::Uint(U256::zero()), // gasPrice
                Token::Address(Address::zero()), // gasToken
                Token::Address(Address::zero()), // refundReceiver
                Token::Uint(nonce),
            ],
        );
        abi::decode_h256(&self.chain.call(wallet, hash_call).await?)
    }

    /// Controller signature over a Safe hash, in the r|s|v form Safe accepts for EOA owners
    fn sign_safe_hash(&self, hash: H256) -> Result<Bytes, WalletError> {
        let signature = self
            .controller
            .sign_hash(hash)
            .map_err(|e| WalletError::Key(format!("Failed to sign Safe hash: {}", e)))?;
        Ok(Bytes::from(signature.to_vec()))
    }

    /// Execute through the Safe with the default wallet-execution gas limit
    pub async fn execute(
        &self,
        wallet: Address,
        to: Address,
        data: Bytes,
        value: U256,
        operation: Operation,
    ) -> Result<TransactionReceipt, WalletError> {
        self.execute_with_gas(wallet, to, data, value, operation, self.gas.wallet_exec)
            .await
    }

    pub async fn execute_with_gas(
        &self,
        wallet: Address,
        to: Address,
        data: Bytes,
        value: U256,
        operation: Operation,
        gas: u64,
    ) -> Result<TransactionReceipt, WalletError> {
        let hash = self.safe_transaction_hash(wallet, to, &data, value, operation).await?;
        let signature = self.sign_safe_hash(hash)?;

        let exec = abi::encode_call(
            safe::EXEC_TRANSACTION,
            &[
                Token::Address(to),
                Token::Uint(value),
                Token::Bytes(data.to_vec()),
                Token::Uint(U256::from(operation.code())),
                Token::Uint(U256::zero()),
                Token::Uint(U256::zero()),
                Token::Uint(U256::zero()),
                Token::Address(Address::zero()),
                Token::Address(Address::zero()),
                Token::Bytes(signature.to_vec()),
            ],
        );

        log::info!(
            "[Signer] Safe {:?} executing {} to {:?} (safe hash {:?})",
            wallet,
            operation,
            to,
            hash
        );
        self.send_from_controller(wallet, exec, gas).await
    }

    /// Agent-key submission through the delegate module
    pub async fn execute_via_module(
        &self,
        module: Address,
        agent: &LocalWallet,
        call: &CallData,
    ) -> Result<TransactionResult, WalletError> {
        let data = abi::encode_call(cobo_account::EXEC_TRANSACTION, &[call.to_token()]);

        log::info!(
            "[Signer] Agent {:?} executing via module {:?} -> {:?} (value {})",
            agent.address(),
            module,
            call.to,
            call.value
        );
        let receipt = self
            .send(agent, module, data, U256::zero(), self.gas.module_exec)
            .await?;
        Ok(result_of(&receipt))
    }
}
