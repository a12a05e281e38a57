use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::U256;

use super::{ActionParams, ParamKind, ParamSpec, Protocol, ProtocolCallBuilder, WalletContext};
use crate::abi::{self, crowdfunding};
use crate::error::WalletError;
use crate::tx::CallData;

pub const AMOUNT: ParamSpec = ParamSpec {
    name: "amount",
    aliases: &[],
    kind: ParamKind::Uint256,
    required: true,
    description: "Raw amount to contribute",
};

pub struct CrowdfundingCallBuilder {
    ctx: WalletContext,
}

impl CrowdfundingCallBuilder {
    pub fn new(ctx: WalletContext) -> Self {
        Self { ctx }
    }

    pub fn contribute(&self, amount: U256) -> CallData {
        let data = abi::encode_call(crowdfunding::CONTRIBUTE, &[Token::Uint(amount)]);
        CallData::call(self.ctx.protocols.crowdfunding, data)
    }
}

#[async_trait]
impl ProtocolCallBuilder for CrowdfundingCallBuilder {
    fn protocol(&self) -> Protocol {
        Protocol::Crowdfunding
    }

    async fn build_transaction(&self, method: &str, params: &ActionParams) -> Result<CallData, WalletError> {
        match method {
            "contribute" => Ok(self.contribute(params.u256(&AMOUNT)?)),
            other => Err(WalletError::UnknownAction(format!("crowdfunding.{}", other))),
        }
    }
}
