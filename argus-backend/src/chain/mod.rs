//! Chain access seam.
//!
//! Everything that touches the network goes through `ChainClient`, so
//! provisioning and dispatch can run against an in-memory chain in tests.

pub mod events;
pub mod rpc;

use async_trait::async_trait;
use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

use crate::error::WalletError;

pub use rpc::RpcChainClient;

/// An unsigned state-changing call; nonce, gas price and chain id are
/// filled in by the client at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> Result<u64, WalletError>;

    /// `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError>;

    async fn balance(&self, address: Address) -> Result<U256, WalletError>;

    /// Sign `request` with `signer` and broadcast it; returns the tx hash
    async fn send_transaction(&self, signer: &LocalWallet, request: TxRequest) -> Result<H256, WalletError>;

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, WalletError>;
}
