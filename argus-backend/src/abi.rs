//! Contract call surface.
//!
//! Calls are encoded from canonical Solidity signatures: the selector is the
//! first four bytes of keccak256(signature) and the arguments are standard ABI
//! encoded tokens. Keeping the signatures as plain constants avoids shipping
//! ABI JSON files next to the binary.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::id;

use crate::error::WalletError;

/// Safe singleton / proxy
pub mod safe {
    pub const SETUP: &str =
        "setup(address[],uint256,address,bytes,address,address,uint256,address)";
    pub const NONCE: &str = "nonce()";
    pub const GET_TRANSACTION_HASH: &str =
        "getTransactionHash(address,uint256,bytes,uint8,uint256,uint256,uint256,address,address,uint256)";
    pub const EXEC_TRANSACTION: &str =
        "execTransaction(address,uint256,bytes,uint8,uint256,uint256,uint256,address,address,bytes)";
    pub const SWAP_OWNER: &str = "swapOwner(address,address,address)";
}

/// SafeProxyFactory
pub mod safe_factory {
    pub const CREATE_PROXY_WITH_NONCE: &str = "createProxyWithNonce(address,bytes,uint256)";
}

/// Safe MultiSend library
pub mod multisend {
    pub const MULTI_SEND: &str = "multiSend(bytes)";
}

/// ArgusAccountHelper, always reached by delegate-call from the Safe
pub mod argus_helper {
    pub const INIT_ARGUS: &str = "initArgus(address,bytes32)";
    pub const CREATE_AUTHORIZER: &str = "createAuthorizer(address,address,bytes32,bytes32)";
    pub const ADD_AUTHORIZER: &str = "addAuthorizer(address,address,bool,bytes32[])";
    pub const GRANT_ROLES: &str = "grantRoles(address,bytes32[],address[])";
}

/// CoboSafeAccount (the delegate-execution module)
pub mod cobo_account {
    pub const EXEC_TRANSACTION: &str = "execTransaction((uint256,address,uint256,bytes,bytes,bytes))";
    pub const ROLE_MANAGER: &str = "roleManager()";
}

/// FlatRoleManager
pub mod role_manager {
    pub const ADD_ROLES: &str = "addRoles(bytes32[])";
}

/// Authorizer implementations
pub mod authorizer {
    pub const NAME: &str = "NAME()";
    pub const SET_APPROVE_LIST_MANAGER: &str = "setApproveListManager(address)";
    pub const ADD_CONTRACTS: &str = "addContracts(address[])";
    pub const ADD_SPENDERS: &str = "addSpenders(address[])";
    pub const SET_ADMIN: &str = "setAdmin(address)";
    pub const ADD_POOL_ADDRESSES: &str = "addPoolAddresses(address[])";
}

pub mod erc20 {
    pub const APPROVE: &str = "approve(address,uint256)";
    pub const ALLOWANCE: &str = "allowance(address,address)";
    pub const BALANCE_OF: &str = "balanceOf(address)";
}

pub mod silo {
    pub const DEPOSIT: &str = "deposit(uint256,address)";
    pub const REDEEM: &str = "redeem(uint256,address,address,uint8)";
    pub const ROUTER_EXECUTE: &str = "execute((uint8,address,address,bytes)[])";
    pub const LENS_GET_DEPOSIT_APR: &str = "getDepositAPR(address)";
}

pub mod crowdfunding {
    pub const CONTRIBUTE: &str = "contribute(uint256)";
}

/// 4-byte selector of a canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    id(signature)
}

/// Selector followed by the ABI-encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&abi::encode(args));
    Bytes::from(data)
}

/// Split calldata into its selector and argument bytes
pub fn split_selector(data: &[u8]) -> Option<([u8; 4], &[u8])> {
    if data.len() < 4 {
        return None;
    }
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&data[..4]);
    Some((sel, &data[4..]))
}

/// Decode the arguments of calldata produced by `encode_call`
pub fn decode_call(signature: &str, types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, WalletError> {
    let (sel, args) = split_selector(data)
        .ok_or_else(|| WalletError::Abi("calldata shorter than a selector".to_string()))?;
    if sel != selector(signature) {
        return Err(WalletError::Abi(format!(
            "selector 0x{} does not match {}",
            hex::encode(sel),
            signature
        )));
    }
    Ok(abi::decode(types, args)?)
}

pub fn address_array(addresses: &[Address]) -> Token {
    Token::Array(addresses.iter().copied().map(Token::Address).collect())
}

pub fn bytes32_array(words: &[[u8; 32]]) -> Token {
    Token::Array(words.iter().map(|w| Token::FixedBytes(w.to_vec())).collect())
}

pub fn decode_address(output: &[u8]) -> Result<Address, WalletError> {
    match abi::decode(&[ParamType::Address], output)?.pop() {
        Some(Token::Address(a)) => Ok(a),
        other => Err(WalletError::Abi(format!("expected address output, got {:?}", other))),
    }
}

pub fn decode_uint(output: &[u8]) -> Result<U256, WalletError> {
    match abi::decode(&[ParamType::Uint(256)], output)?.pop() {
        Some(Token::Uint(v)) => Ok(v),
        other => Err(WalletError::Abi(format!("expected uint256 output, got {:?}", other))),
    }
}

pub fn decode_bytes32(output: &[u8]) -> Result<[u8; 32], WalletError> {
    match abi::decode(&[ParamType::FixedBytes(32)], output)?.pop() {
        Some(Token::FixedBytes(b)) if b.len() == 32 => {
            let mut word = [0u8; 32];
            word.copy_from_slice(&b);
            Ok(word)
        }
        other => Err(WalletError::Abi(format!("expected bytes32 output, got {:?}", other))),
    }
}

pub fn decode_h256(output: &[u8]) -> Result<H256, WalletError> {
    decode_bytes32(output).map(H256::from)
}
