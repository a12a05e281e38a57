//! ERC-20 calls.

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{ActionParams, ParamKind, ParamSpec, Protocol, ProtocolCallBuilder, WalletContext};
use crate::abi::{self, erc20};
use crate::error::WalletError;
use crate::tx::CallData;

pub const TOKEN_ADDRESS: ParamSpec = ParamSpec {
    name: "token_address",
    aliases: &["token"],
    kind: ParamKind::Address,
    required: true,
    description: "ERC-20 token contract address",
};

pub const SPENDER_ADDRESS: ParamSpec = ParamSpec {
    name: "spender_address",
    aliases: &["spender"],
    kind: ParamKind::Address,
    required: true,
    description: "Address allowed to spend the tokens",
};

pub const AMOUNT: ParamSpec = ParamSpec {
    name: "amount",
    aliases: &[],
    kind: ParamKind::Uint256,
    required: false,
    description: "Raw token amount (smallest unit). Omit for an unlimited approval",
};

pub struct TokenCallBuilder {
    ctx: WalletContext,
}

impl TokenCallBuilder {
    pub fn new(ctx: WalletContext) -> Self {
        Self { ctx }
    }

    /// `approve(spender, amount)`, defaulting to the maximum uint256
    pub fn approve(&self, token: Address, spender: Address, amount: Option<U256>) -> CallData {
        let amount = amount.unwrap_or(U256::MAX);
        let data = abi::encode_call(erc20::APPROVE, &[Token::Address(spender), Token::Uint(amount)]);
        CallData::call(token, data)
    }

    /// Current allowance granted by the wallet to `spender`
    pub async fn allowance(&self, token: Address, spender: Address) -> Result<U256, WalletError> {
        let data = abi::encode_call(
            erc20::ALLOWANCE,
            &[Token::Address(self.ctx.wallet), Token::Address(spender)],
        );
        abi::decode_uint(&self.ctx.chain.call(token, data).await?)
    }

    pub async fn token_balance(&self, token: Address) -> Result<U256, WalletError> {
        let data = abi::encode_call(erc20::BALANCE_OF, &[Token::Address(self.ctx.wallet)]);
        abi::decode_uint(&self.ctx.chain.call(token, data).await?)
    }

    pub async fn native_balance(&self) -> Result<U256, WalletError> {
        self.ctx.chain.balance(self.ctx.wallet).await
    }
}

#[async_trait]
impl ProtocolCallBuilder for TokenCallBuilder {
    fn protocol(&self) -> Protocol {
        Protocol::Token
    }

    async fn build_transaction(&self, method: &str, params: &ActionParams) -> Result<CallData, WalletError> {
        match method {
            "approve" => {
                let token = params.address(&TOKEN_ADDRESS)?;
                let spender = params.address(&SPENDER_ADDRESS)?;
                let amount = params.opt_u256(&AMOUNT)?;
                log::info!(
                    "[Token] approve {:?} for {:?} (amount {})",
                    token,
                    spender,
                    amount.map(|a| a.to_string()).unwrap_or_else(|| "max".to_string())
                );
                Ok(self.approve(token, spender, amount))
            }
            other => Err(WalletError::UnknownAction(format!("token.{}", other))),
        }
    }
}
