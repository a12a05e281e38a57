//! MultiSend batch encoding.
//!
//! Wire layout per call, concatenated with no separators:
//! `operation (1) | to (20) | value (32, BE) | data length (32, BE) | data`.
//! The packed buffer is wrapped in `multiSend(bytes)` and executed by the Safe
//! as a single delegate-call, so the batch applies entirely or not at all.

use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};

use crate::abi;
use crate::error::WalletError;

use super::types::Operation;

const HEADER_LEN: usize = 1 + 20 + 32 + 32;

/// One sub-call of a MultiSend batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub operation: Operation,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl BatchCall {
    pub fn call(to: Address, data: Bytes) -> Self {
        Self { operation: Operation::Call, to, value: U256::zero(), data }
    }

    pub fn delegate_call(to: Address, data: Bytes) -> Self {
        Self { operation: Operation::DelegateCall, to, value: U256::zero(), data }
    }
}

/// Pack calls into the MultiSend transaction buffer
pub fn pack(calls: &[BatchCall]) -> Bytes {
    let total: usize = calls.iter().map(|c| HEADER_LEN + c.data.len()).sum();
    let mut out = Vec::with_capacity(total);

    for call in calls {
        let mut word = [0u8; 32];

        out.push(call.operation.code());
        out.extend_from_slice(call.to.as_bytes());
        call.value.to_big_endian(&mut word);
        out.extend_from_slice(&word);
        U256::from(call.data.len()).to_big_endian(&mut word);
        out.extend_from_slice(&word);
        out.extend_from_slice(&call.data);
    }

    Bytes::from(out)
}

/// Exact inverse of `pack`
pub fn unpack(buf: &[u8]) -> Result<Vec<BatchCall>, WalletError> {
    let mut calls = Vec::new();
    let mut pos = 0;

    while pos < buf.len() {
        if buf.len() - pos < HEADER_LEN {
            return Err(WalletError::Abi(format!(
                "truncated multisend header at offset {}",
                pos
            )));
        }

        let operation = Operation::from_code(buf[pos]).ok_or_else(|| {
            WalletError::Abi(format!("invalid multisend operation {} at offset {}", buf[pos], pos))
        })?;
        let to = Address::from_slice(&buf[pos + 1..pos + 21]);
        let value = U256::from_big_endian(&buf[pos + 21..pos + 53]);
        let len = U256::from_big_endian(&buf[pos + 53..pos + 85]);
        pos += HEADER_LEN;

        let remaining = buf.len() - pos;
        if len > U256::from(remaining) {
            return Err(WalletError::Abi(format!(
                "multisend payload length {} exceeds remaining {} bytes",
                len, remaining
            )));
        }
        let len = len.as_usize();

        calls.push(BatchCall {
            operation,
            to,
            value,
            data: Bytes::from(buf[pos..pos + len].to_vec()),
        });
        pos += len;
    }

    Ok(calls)
}

/// `multiSend(bytes)` calldata for a batch
pub fn encode_multisend(calls: &[BatchCall]) -> Bytes {
    abi::encode_call(abi::multisend::MULTI_SEND, &[Token::Bytes(pack(calls).to_vec())])
}
