//! In-memory chain for unit tests.
//!
//! `MockChain` answers the handful of reads the crate makes, records every
//! submitted transaction, and emits the deployment events the real factories
//! would: a `ProxyCreation` for factory calls, `ArgusInitialized` when a Safe
//! delegate-calls `initArgus`, and `ProxyCreated` for `createAuthorizer`.

use async_trait::async_trait;
use chrono::Utc;
use ethers::abi::{ParamType, Token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256, U64};
use ethers::utils::keccak256;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::abi::{self, argus_helper, authorizer, cobo_account, erc20, safe, safe_factory, silo};
use crate::chain::events::{ARGUS_INITIALIZED, PROXY_CREATED, PROXY_CREATION};
use crate::chain::{ChainClient, TxRequest};
use crate::config::{self, defaults, Config, ContractAddresses, GasLimits, ProtocolAddresses, SeedLists};
use crate::db::Database;
use crate::error::WalletError;
use crate::keys::KeyDerivationService;
use crate::models::WalletRecord;
use crate::protocols::WalletContext;
use crate::service::WalletService;
use crate::tx::{CallData, Operation};

pub const TEST_PHRASE: &str = "test test test test test test test test test test test junk";

/// Controller key used by every test config
pub const CONTROLLER_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

fn addr(value: &str) -> Address {
    config::parse_address("test", value).unwrap()
}

fn addrs(values: &[&str]) -> Vec<Address> {
    values.iter().map(|v| addr(v)).collect()
}

pub fn test_config() -> Config {
    Config {
        rpc_url: "http://localhost:8545".to_string(),
        chain_id: defaults::CHAIN_ID,
        database_url: String::new(),
        controller_key: config::parse_private_key(CONTROLLER_KEY)
            .unwrap()
            .with_chain_id(defaults::CHAIN_ID),
        agent_mnemonic: Some(TEST_PHRASE.to_string()),
        contracts: ContractAddresses {
            safe_factory: addr(defaults::SAFE_FACTORY_ADDRESS),
            safe_singleton: addr(defaults::SAFE_SINGLETON_ADDRESS),
            fallback_handler: addr(defaults::FALLBACK_HANDLER_ADDRESS),
            cobo_factory: addr(defaults::COBO_FACTORY_ADDRESS),
            argus_helper: addr(defaults::ARGUS_HELPER_ADDRESS),
            multisend: addr(defaults::MULTISEND_ADDRESS),
            approve_authorizer_impl: addr(defaults::APPROVE_AUTHORIZER_IMPL),
            silo_authorizer_impl: addr(defaults::SILO_AUTHORIZER_IMPL),
        },
        protocols: ProtocolAddresses::default_addresses().unwrap(),
        seeds: SeedLists {
            contracts: addrs(defaults::INITIAL_CONTRACTS),
            spenders: addrs(defaults::INITIAL_SPENDERS),
            silos: addrs(defaults::INITIAL_SILOS),
        },
        gas: GasLimits::default(),
        receipt_timeout: Duration::from_millis(50),
        receipt_poll_interval: Duration::from_millis(5),
        transfer_ownership_to_user: true,
    }
}

/// Service over a fresh database in a temp dir; keep the dir alive for the test
pub fn test_service(config: Config) -> (WalletService, Arc<MockChain>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallets.db");
    let db = Arc::new(Database::new(path.to_str().unwrap()).unwrap());
    let mock = Arc::new(MockChain::new());
    let service = WalletService::new(Arc::new(config), db, mock.clone());
    (service, mock, dir)
}

/// Context for a provisioned wallet (user 0x01.., wallet 0x5a.., module 0x3c..)
pub fn wallet_context(chain: Arc<dyn ChainClient>) -> WalletContext {
    let config = test_config();
    WalletContext {
        user: Address::repeat_byte(0x01),
        wallet: Address::repeat_byte(0x5a),
        delegate_module: Address::repeat_byte(0x3c),
        chain,
        protocols: config.protocols,
        markets: config.seeds.silos,
    }
}

/// Fully provisioned record matching `wallet_context`, agent at index 0
pub fn test_record() -> WalletRecord {
    let agent = KeyDerivationService::new(Some(TEST_PHRASE.to_string()))
        .derive(0)
        .unwrap();
    WalletRecord {
        user_address: Address::repeat_byte(0x01),
        wallet_address: Address::repeat_byte(0x5a),
        delegate_module_address: Some(Address::repeat_byte(0x3c)),
        agent_address: agent.address,
        agent_key: agent.private_key,
        ownership_transferred: true,
        created_at: Utc::now(),
    }
}

fn name_word(name: &str) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[..name.len()].copy_from_slice(name.as_bytes());
    word
}

/// A submitted transaction as the mock saw it
#[derive(Debug, Clone)]
pub struct SentTx {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas: u64,
    pub hash: H256,
}

/// The call a Safe `execTransaction` carries
#[derive(Debug, Clone)]
pub struct InnerCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
}

impl SentTx {
    pub fn safe_inner_call(&self) -> Option<InnerCall> {
        let args = abi::decode_call(
            safe::EXEC_TRANSACTION,
            &[
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Bytes,
                ParamType::Uint(8),
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Address,
                ParamType::Address,
                ParamType::Bytes,
            ],
            &self.data,
        )
        .ok()?;
        match (&args[0], &args[1], &args[2], &args[3]) {
            (Token::Address(to), Token::Uint(value), Token::Bytes(data), Token::Uint(op)) => Some(InnerCall {
                to: *to,
                value: *value,
                data: Bytes::from(data.clone()),
                operation: Operation::from_code(op.low_u32() as u8)?,
            }),
            _ => None,
        }
    }

    pub fn module_inner_call(&self) -> Option<CallData> {
        let mut args = abi::decode_call(
            cobo_account::EXEC_TRANSACTION,
            &[ParamType::Tuple(vec![
                ParamType::Uint(256),
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Bytes,
                ParamType::Bytes,
                ParamType::Bytes,
            ])],
            &self.data,
        )
        .ok()?;
        CallData::from_token(args.pop()?).ok()
    }

    fn selectors(&self) -> Vec<[u8; 4]> {
        let mut out = Vec::new();
        if let Some((sel, _)) = abi::split_selector(&self.data) {
            out.push(sel);
        }
        if let Some(inner) = self.safe_inner_call() {
            if let Some((sel, _)) = abi::split_selector(&inner.data) {
                out.push(sel);
            }
        }
        if let Some(inner) = self.module_inner_call() {
            if let Some((sel, _)) = abi::split_selector(&inner.data) {
                out.push(sel);
            }
        }
        out
    }
}

#[derive(Default)]
struct MockState {
    block_number: u64,
    sent: Vec<SentTx>,
    receipts: HashMap<H256, TransactionReceipt>,
    safe_nonces: HashMap<Address, u64>,
    names: HashMap<Address, [u8; 32]>,
    token_balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    native_balances: HashMap<Address, U256>,
    deposit_aprs: HashMap<Address, U256>,
    fail_selectors: HashSet<[u8; 4]>,
    drop_events: bool,
    withhold_receipts: bool,
    wallets: u64,
    modules: u64,
    authorizers: u64,
}

pub struct MockChain {
    state: Mutex<MockState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        let contracts = test_config().contracts;
        let mut state = MockState {
            block_number: 1000,
            ..Default::default()
        };
        state
            .names
            .insert(contracts.approve_authorizer_impl, name_word("ApproveAuthorizerV2"));
        state
            .names
            .insert(contracts.silo_authorizer_impl, name_word("SiloAuthorizer"));
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn wallet_address(n: u64) -> Address {
        Address::from_low_u64_be(0x5afe_0000 + n)
    }

    pub fn module_address(n: u64) -> Address {
        Address::from_low_u64_be(0xa760_0000 + n)
    }

    pub fn authorizer_address(n: u64) -> Address {
        Address::from_low_u64_be(0xa070_0000 + n)
    }

    /// Role manager reported by every delegate module
    pub fn role_manager_address() -> Address {
        Address::from_low_u64_be(0x7013_0000)
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn safe_nonce(&self, wallet: Address) -> u64 {
        self.state.lock().unwrap().safe_nonces.get(&wallet).copied().unwrap_or(0)
    }

    pub fn set_block_number(&self, block: u64) {
        self.state.lock().unwrap().block_number = block;
    }

    /// Revert any transaction whose outer, Safe-inner or module-inner call uses `signature`
    pub fn fail_selector(&self, signature: &str) {
        self.state.lock().unwrap().fail_selectors.insert(abi::selector(signature));
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().fail_selectors.clear();
    }

    pub fn drop_events(&self, drop: bool) {
        self.state.lock().unwrap().drop_events = drop;
    }

    pub fn withhold_receipts(&self, withhold: bool) {
        self.state.lock().unwrap().withhold_receipts = withhold;
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state.lock().unwrap().token_balances.insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state.lock().unwrap().allowances.insert((token, owner, spender), amount);
    }

    pub fn set_native_balance(&self, owner: Address, amount: U256) {
        self.state.lock().unwrap().native_balances.insert(owner, amount);
    }

    pub fn set_deposit_apr(&self, market: Address, apr: U256) {
        self.state.lock().unwrap().deposit_aprs.insert(market, apr);
    }
}

fn word_output(token: Token) -> Bytes {
    Bytes::from(ethers::abi::encode(&[token]))
}

fn arg_address(data: &[u8], index: usize) -> Address {
    let start = 4 + 32 * index + 12;
    data.get(start..start + 20)
        .map(Address::from_slice)
        .unwrap_or_default()
}

#[async_trait]
impl ChainClient for MockChain {
    async fn block_number(&self) -> Result<u64, WalletError> {
        Ok(self.state.lock().unwrap().block_number)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError> {
        let state = self.state.lock().unwrap();
        let sel = abi::split_selector(&data)
            .map(|(s, _)| s)
            .ok_or_else(|| WalletError::RpcUnavailable("empty calldata".to_string()))?;

        let output = if sel == abi::selector(safe::NONCE) {
            word_output(Token::Uint(U256::from(
                state.safe_nonces.get(&to).copied().unwrap_or(0),
            )))
        } else if sel == abi::selector(safe::GET_TRANSACTION_HASH) {
            word_output(Token::FixedBytes(keccak256(&data).to_vec()))
        } else if sel == abi::selector(authorizer::NAME) {
            let name = state.names.get(&to).copied().unwrap_or([0u8; 32]);
            word_output(Token::FixedBytes(name.to_vec()))
        } else if sel == abi::selector(cobo_account::ROLE_MANAGER) {
            word_output(Token::Address(Self::role_manager_address()))
        } else if sel == abi::selector(erc20::ALLOWANCE) {
            let key = (to, arg_address(&data, 0), arg_address(&data, 1));
            word_output(Token::Uint(state.allowances.get(&key).copied().unwrap_or_default()))
        } else if sel == abi::selector(erc20::BALANCE_OF) {
            let owner = arg_address(&data, 0);
            let balance = state.token_balances.get(&(to, owner)).copied().unwrap_or_default();
            word_output(Token::Uint(balance))
        } else if sel == abi::selector(silo::LENS_GET_DEPOSIT_APR) {
            let market = arg_address(&data, 0);
            let apr = state.deposit_aprs.get(&market).copied().unwrap_or_default();
            word_output(Token::Uint(apr))
        } else {
            return Err(WalletError::RpcUnavailable(format!(
                "mock has no answer for selector 0x{}",
                hex::encode(sel)
            )));
        };
        Ok(output)
    }

    async fn balance(&self, address: Address) -> Result<U256, WalletError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .native_balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn send_transaction(&self, signer: &LocalWallet, request: TxRequest) -> Result<H256, WalletError> {
        let mut state = self.state.lock().unwrap();
        let from = signer.address();

        let mut preimage = from.as_bytes().to_vec();
        preimage.extend_from_slice(&(state.sent.len() as u64).to_be_bytes());
        let hash = H256::from(keccak256(&preimage));

        let tx = SentTx {
            from,
            to: request.to,
            data: request.data,
            value: request.value,
            gas: request.gas,
            hash,
        };

        let failed = tx.selectors().iter().any(|s| state.fail_selectors.contains(s));
        let mut logs = Vec::new();

        if !failed {
            let outer = abi::split_selector(&tx.data).map(|(s, _)| s);
            let inner = tx.safe_inner_call();
            let inner_sel = inner
                .as_ref()
                .and_then(|c| abi::split_selector(&c.data).map(|(s, _)| s));

            if outer == Some(abi::selector(safe_factory::CREATE_PROXY_WITH_NONCE)) {
                let wallet = Self::wallet_address(state.wallets);
                state.wallets += 1;
                logs.push(Log {
                    address: tx.to,
                    topics: vec![PROXY_CREATION.topic0, H256::from(wallet)],
                    data: Bytes::from(H256::zero().as_bytes().to_vec()),
                    ..Default::default()
                });
            }
            if inner_sel == Some(abi::selector(argus_helper::INIT_ARGUS)) {
                let module = Self::module_address(state.modules);
                state.modules += 1;
                logs.push(Log {
                    address: tx.to,
                    topics: vec![ARGUS_INITIALIZED.topic0, H256::from(module)],
                    ..Default::default()
                });
            }
            if inner_sel == Some(abi::selector(argus_helper::CREATE_AUTHORIZER)) {
                let created = Self::authorizer_address(state.authorizers);
                state.authorizers += 1;
                logs.push(Log {
                    address: tx.to,
                    topics: vec![PROXY_CREATED.topic0],
                    data: Bytes::from(H256::from(created).as_bytes().to_vec()),
                    ..Default::default()
                });
            }
            if inner.is_some() {
                *state.safe_nonces.entry(tx.to).or_insert(0) += 1;
            }
        }

        if state.drop_events {
            logs.clear();
        }

        let receipt = TransactionReceipt {
            transaction_hash: hash,
            from,
            to: Some(tx.to),
            status: Some(U64::from(if failed { 0 } else { 1 })),
            logs,
            ..Default::default()
        };

        if !state.withhold_receipts {
            state.receipts.insert(hash, receipt);
        }
        state.sent.push(tx);
        Ok(hash)
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, WalletError> {
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).cloned())
    }
}
