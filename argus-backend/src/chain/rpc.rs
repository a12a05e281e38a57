//! JSON-RPC implementation of `ChainClient` over an ethers HTTP provider.

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockNumber, Bytes, TransactionReceipt, TransactionRequest, H256, U256,
};

use super::{ChainClient, TxRequest};
use crate::error::WalletError;

fn rpc_err(e: ProviderError) -> WalletError {
    WalletError::RpcUnavailable(e.to_string())
}

pub struct RpcChainClient {
    provider: Provider<Http>,
    chain_id: u64,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self, WalletError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| WalletError::Config(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        log::info!("[RPC] Using {} (chain_id={})", rpc_url, chain_id);

        Ok(Self { provider, chain_id })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64, WalletError> {
        let block = self.provider.get_block_number().await.map_err(rpc_err)?;
        Ok(block.as_u64())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.provider.call(&tx, None).await.map_err(rpc_err)
    }

    async fn balance(&self, address: Address) -> Result<U256, WalletError> {
        self.provider.get_balance(address, None).await.map_err(rpc_err)
    }

    async fn send_transaction(&self, signer: &LocalWallet, request: TxRequest) -> Result<H256, WalletError> {
        let from = signer.address();

        let nonce = self
            .provider
            .get_transaction_count(from, Some(BlockNumber::Pending.into()))
            .await
            .map_err(rpc_err)?;
        let gas_price = self.provider.get_gas_price().await.map_err(rpc_err)?;

        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(request.to)
            .data(request.data)
            .value(request.value)
            .gas(request.gas)
            .gas_price(gas_price)
            .nonce(nonce)
            .chain_id(self.chain_id)
            .into();

        let signature = signer
            .sign_transaction_sync(&tx)
            .map_err(|e| WalletError::Key(format!("Failed to sign transaction: {}", e)))?;
        let raw = tx.rlp_signed(&signature);

        let pending = self.provider.send_raw_transaction(raw).await.map_err(rpc_err)?;
        let tx_hash = pending.tx_hash();

        log::debug!("[RPC] Sent {:?} from {:?} nonce={}", tx_hash, from, nonce);
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, WalletError> {
        self.provider.get_transaction_receipt(tx_hash).await.map_err(rpc_err)
    }
}
