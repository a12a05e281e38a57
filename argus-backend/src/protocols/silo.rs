//! Silo markets: ERC-4626 deposit/redeem on the market, native deposits
//! through the Silo router, deposit APRs from the Silo lens.

use async_trait::async_trait;
use ethers::abi::{self as ethabi, Token};
use ethers::types::{Address, U256};
use serde::Serialize;

use super::{ActionParams, ParamKind, ParamSpec, Protocol, ProtocolCallBuilder, WalletContext};
use crate::abi::{self, silo};
use crate::error::WalletError;
use crate::tx::CallData;

pub const SILO_ADDRESS: ParamSpec = ParamSpec {
    name: "silo_address",
    aliases: &["silo"],
    kind: ParamKind::Address,
    required: true,
    description: "Silo market contract address",
};

pub const AMOUNT: ParamSpec = ParamSpec {
    name: "amount",
    aliases: &[],
    kind: ParamKind::Uint256,
    required: true,
    description: "Raw amount (assets for deposits, shares for withdrawals)",
};

/// Router action type for a deposit
const ROUTER_ACTION_DEPOSIT: u8 = 0;
/// Collateral type passed to deposits and redeems
const COLLATERAL_TYPE: u8 = 0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiloApr {
    pub silo_address: Address,
    /// Annual deposit rate in percent
    pub apr: f64,
}

pub struct SiloCallBuilder {
    ctx: WalletContext,
}

impl SiloCallBuilder {
    pub fn new(ctx: WalletContext) -> Self {
        Self { ctx }
    }

    /// Deposit `amount` of the market asset, shares minted to the wallet
    pub fn deposit(&self, silo_address: Address, amount: U256) -> CallData {
        let data = abi::encode_call(
            silo::DEPOSIT,
            &[Token::Uint(amount), Token::Address(self.ctx.wallet)],
        );
        CallData::call(silo_address, data)
    }

    /// Redeem `shares` back to the wallet
    pub fn withdraw(&self, silo_address: Address, shares: U256) -> CallData {
        let data = abi::encode_call(
            silo::REDEEM,
            &[
                Token::Uint(shares),
                Token::Address(self.ctx.wallet),
                Token::Address(self.ctx.wallet),
                Token::Uint(U256::from(COLLATERAL_TYPE)),
            ],
        );
        CallData::call(silo_address, data)
    }

    /// Deposit native coin via the router, which wraps it before depositing.
    /// The value leaves the wallet with the call.
    pub fn deposit_native(&self, silo_address: Address, amount: U256) -> CallData {
        let options = ethabi::encode(&[Token::Uint(amount), Token::Uint(U256::from(COLLATERAL_TYPE))]);
        let action = Token::Tuple(vec![
            Token::Uint(U256::from(ROUTER_ACTION_DEPOSIT)),
            Token::Address(silo_address),
            Token::Address(self.ctx.protocols.wrapped_native),
            Token::Bytes(options),
        ]);
        let data = abi::encode_call(silo::ROUTER_EXECUTE, &[Token::Array(vec![action])]);

        CallData::call(self.ctx.protocols.silo_router, data).with_value(amount)
    }

    /// Deposit APR of every configured market, as a percentage
    pub async fn deposit_aprs(&self) -> Result<Vec<SiloApr>, WalletError> {
        let mut results = Vec::with_capacity(self.ctx.markets.len());

        for market in &self.ctx.markets {
            let data = abi::encode_call(silo::LENS_GET_DEPOSIT_APR, &[Token::Address(*market)]);
            let raw = abi::decode_uint(&self.ctx.chain.call(self.ctx.protocols.silo_lens, data).await?)?;
            results.push(SiloApr {
                silo_address: *market,
                apr: wad_to_percent(raw),
            });
        }

        Ok(results)
    }
}

/// 1e18-scaled fraction to percent
fn wad_to_percent(raw: U256) -> f64 {
    let whole = (raw / U256::exp10(18)).low_u128() as f64;
    let frac = (raw % U256::exp10(18)).low_u128() as f64 / 1e18;
    (whole + frac) * 100.0
}

#[async_trait]
impl ProtocolCallBuilder for SiloCallBuilder {
    fn protocol(&self) -> Protocol {
        Protocol::Silo
    }

    async fn build_transaction(&self, method: &str, params: &ActionParams) -> Result<CallData, WalletError> {
        let silo_address = params.address(&SILO_ADDRESS)?;
        let amount = params.u256(&AMOUNT)?;
        log::info!("[Silo] {} {} on {:?}", method, amount, silo_address);

        match method {
            "deposit" => Ok(self.deposit(silo_address, amount)),
            "withdraw" => Ok(self.withdraw(silo_address, amount)),
            "deposit_native" => Ok(self.deposit_native(silo_address, amount)),
            other => Err(WalletError::UnknownAction(format!("silo.{}", other))),
        }
    }
}
