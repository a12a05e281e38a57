use ethers::abi::Token;
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::WalletError;

/// Safe / MultiSend operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Call,
    DelegateCall,
}

impl Operation {
    pub fn code(self) -> u8 {
        match self {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Operation::Call),
            1 => Some(Operation::DelegateCall),
            _ => None,
        }
    }
}

/// The unit accepted by the delegate module's `execTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallData {
    /// Call-kind selector: 0 = call, 1 = delegate-call
    pub flag: U256,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub hint: Bytes,
    pub extra: Bytes,
}

impl CallData {
    /// A plain call with no value, hint or extra data
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            flag: U256::zero(),
            to,
            value: U256::zero(),
            data,
            hint: Bytes::new(),
            extra: Bytes::new(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Uint(self.flag),
            Token::Address(self.to),
            Token::Uint(self.value),
            Token::Bytes(self.data.to_vec()),
            Token::Bytes(self.hint.to_vec()),
            Token::Bytes(self.extra.to_vec()),
        ])
    }

    pub fn from_token(token: Token) -> Result<Self, WalletError> {
        let fields = match token {
            Token::Tuple(fields) if fields.len() == 6 => fields,
            other => return Err(WalletError::Abi(format!("expected CallData tuple, got {:?}", other))),
        };
        let mut it = fields.into_iter();
        let (flag, to, value, data, hint, extra) = (
            it.next(),
            it.next(),
            it.next(),
            it.next(),
            it.next(),
            it.next(),
        );
        match (flag, to, value, data, hint, extra) {
            (
                Some(Token::Uint(flag)),
                Some(Token::Address(to)),
                Some(Token::Uint(value)),
                Some(Token::Bytes(data)),
                Some(Token::Bytes(hint)),
                Some(Token::Bytes(extra)),
            ) => Ok(Self {
                flag,
                to,
                value,
                data: data.into(),
                hint: hint.into(),
                extra: extra.into(),
            }),
            _ => Err(WalletError::Abi("malformed CallData tuple".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub tx_hash: H256,
    pub status: TxStatus,
}

impl TransactionResult {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// Turn a failed receipt into `TransactionReverted`
    pub fn require_success(self) -> Result<Self, WalletError> {
        match self.status {
            TxStatus::Success => Ok(self),
            TxStatus::Failed => Err(WalletError::TransactionReverted(self.tx_hash)),
        }
    }
}
