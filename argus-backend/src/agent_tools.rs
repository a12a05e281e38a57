//! Function-call boundary for the AI agent.
//!
//! The agent sees one function per registered action plus a few read-only
//! helpers. Every call comes back as a plain string the agent can relay;
//! errors are rendered with their kind instead of being raised.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::chain::events::checksummed;
use crate::error::WalletError;
use crate::protocols::registry::{ActionHandler, ACTIONS};
use crate::protocols::{token, ActionDispatcher, ActionParams, ParamSpec};
use crate::service::WalletService;

pub const GET_WALLET_BALANCE: &str = "get_wallet_balance";
pub const GET_TOKEN_BALANCE: &str = "get_token_balance";
pub const GET_TOKEN_ALLOWANCE: &str = "get_token_allowance";
pub const GET_SILO_DEPOSIT_APRS: &str = "get_silo_deposit_aprs";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "parameters")]
    pub input_schema: ToolInputSchema,
}

fn property(spec: &ParamSpec) -> PropertySchema {
    let mut description = spec.description.to_string();
    if !spec.aliases.is_empty() {
        description.push_str(&format!(" (also accepted as: {})", spec.aliases.join(", ")));
    }
    PropertySchema {
        schema_type: spec.kind.json_type().to_string(),
        description,
        default: None,
    }
}

fn schema_for(params: &[ParamSpec]) -> ToolInputSchema {
    ToolInputSchema {
        schema_type: "object".to_string(),
        properties: params
            .iter()
            .map(|p| (p.name.to_string(), property(p)))
            .collect(),
        required: params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.to_string())
            .collect(),
    }
}

fn action_definition(handler: &ActionHandler) -> ToolDefinition {
    ToolDefinition {
        name: handler.action.to_string(),
        description: handler.description.to_string(),
        input_schema: schema_for(handler.params),
    }
}

/// Every function the agent may call
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let mut definitions: Vec<ToolDefinition> = ACTIONS.iter().map(action_definition).collect();

    definitions.push(ToolDefinition {
        name: GET_WALLET_BALANCE.to_string(),
        description: "Native coin balance of the user's wallet, in wei".to_string(),
        input_schema: schema_for(&[]),
    });
    definitions.push(ToolDefinition {
        name: GET_TOKEN_BALANCE.to_string(),
        description: "ERC-20 balance of the user's wallet, in the token's smallest unit".to_string(),
        input_schema: schema_for(&[token::TOKEN_ADDRESS]),
    });
    definitions.push(ToolDefinition {
        name: GET_TOKEN_ALLOWANCE.to_string(),
        description: "How much of a token the user's wallet lets a spender move".to_string(),
        input_schema: schema_for(&[token::TOKEN_ADDRESS, token::SPENDER_ADDRESS]),
    });
    definitions.push(ToolDefinition {
        name: GET_SILO_DEPOSIT_APRS.to_string(),
        description: "Current deposit APR of each supported Silo market, in percent".to_string(),
        input_schema: schema_for(&[]),
    });

    definitions
}

fn parse_arguments(arguments: &str) -> Result<ActionParams, WalletError> {
    if arguments.trim().is_empty() {
        return Ok(ActionParams::default());
    }
    let value: Value = serde_json::from_str(arguments)
        .map_err(|e| WalletError::invalid_param("arguments", format!("not valid JSON: {}", e)))?;
    ActionParams::from_json(value)
}

async fn run(service: &WalletService, user: Address, name: &str, arguments: &str) -> Result<String, WalletError> {
    let params = parse_arguments(arguments)?;

    match name {
        GET_WALLET_BALANCE => {
            let wallet = service.get_wallet_info(user)?.wallet_address;
            let balance = service.wallet_balance(user).await?;
            Ok(format!("Wallet {} holds {} wei", checksummed(&wallet), balance))
        }
        GET_TOKEN_BALANCE => {
            let token_address = params.address(&token::TOKEN_ADDRESS)?;
            let balance = service.token_balance(user, token_address).await?;
            Ok(format!(
                "Wallet balance of token {}: {}",
                checksummed(&token_address),
                balance
            ))
        }
        GET_TOKEN_ALLOWANCE => {
            let token_address = params.address(&token::TOKEN_ADDRESS)?;
            let spender = params.address(&token::SPENDER_ADDRESS)?;
            let allowance = service.token_allowance(user, token_address, spender).await?;
            Ok(format!(
                "Allowance of token {} for spender {}: {}",
                checksummed(&token_address),
                checksummed(&spender),
                allowance
            ))
        }
        GET_SILO_DEPOSIT_APRS => {
            let aprs = service.silo_deposit_aprs(user).await?;
            let lines: Vec<String> = aprs
                .iter()
                .map(|a| format!("{}: {:.2}%", checksummed(&a.silo_address), a.apr))
                .collect();
            Ok(format!("Silo deposit APRs:\n{}", lines.join("\n")))
        }
        action => {
            let handler = ActionDispatcher::resolve(action)?;
            let result = service.execute_action(user, handler.action, &params).await?;
            Ok(format!(
                "{} succeeded in transaction {:?}",
                handler.action, result.tx_hash
            ))
        }
    }
}

/// Execute one agent function call for `user`, rendering the outcome as text
pub async fn handle_function_call(service: &WalletService, user: Address, name: &str, arguments: &str) -> String {
    log::info!("[AgentTools] {} called for {:?}", name, user);

    match run(service, user, name, arguments).await {
        Ok(message) => message,
        Err(e) => {
            log::warn!("[AgentTools] {} failed for {:?}: {}", name, user, e);
            format!("Error ({}): {}", e.kind(), e)
        }
    }
}
