use clap::{Parser, Subcommand};
use dotenv::dotenv;
use ethers::types::Address;
use std::process::ExitCode;
use std::sync::Arc;

mod abi;
mod agent_tools;
mod chain;
mod config;
mod db;
mod error;
mod keys;
mod models;
mod protocols;
mod provisioning;
mod service;
mod tx;

#[cfg(test)]
mod test_support;

use chain::RpcChainClient;
use config::Config;
use db::Database;
use error::WalletError;
use protocols::ActionParams;
use provisioning::{AuthorizerKind, SeedingStep};
use service::WalletService;

#[derive(Parser, Debug)]
#[command(name = "argus-backend", version, about = "Safe + Cobo Argus wallet provisioning and agent execution")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy and fully provision a wallet for a user
    CreateWallet { user: String },
    /// Run a registered action for a user, params as a JSON object
    Execute {
        user: String,
        action: String,
        #[arg(default_value = "{}")]
        params: String,
    },
    /// Print the action catalogue as JSON
    Describe,
    /// Print the agent function definitions as JSON
    Tools,
    /// Run one agent function call for a user and print the reply
    Call {
        user: String,
        function: String,
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// Show a user's wallet record (no secrets)
    Info { user: String },
    /// Re-run an authorizer's seeding sequence from a given step
    ResumeSeeding {
        user: String,
        kind: String,
        authorizer: String,
        step: String,
    },
    /// Re-submit the role wiring batch for an authorizer
    RewireRole {
        user: String,
        kind: String,
        authorizer: String,
    },
}

fn parse_user(value: &str) -> Result<Address, WalletError> {
    config::parse_address("user", value)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, WalletError> {
    serde_json::to_string_pretty(value).map_err(|e| WalletError::Abi(format!("Failed to render JSON: {}", e)))
}

async fn run(command: Command) -> Result<(), WalletError> {
    // Read-only listings need no chain or database
    match &command {
        Command::Describe => {
            println!("{}", to_json(&WalletService::describe_actions())?);
            return Ok(());
        }
        Command::Tools => {
            println!("{}", to_json(&agent_tools::tool_definitions())?);
            return Ok(());
        }
        _ => {}
    }

    let config = Arc::new(Config::from_env()?);
    let chain = Arc::new(RpcChainClient::new(&config.rpc_url, config.chain_id)?);
    let db = Arc::new(Database::new(&config.database_url)?);
    log::info!("{} wallets on record", db.count_wallets()?);
    let service = WalletService::new(config, db, chain);
    log::info!("Controller address: {:?}", service.controller_address());

    match command {
        Command::CreateWallet { user } => {
            let created = service.create_wallet(parse_user(&user)?).await?;
            println!("{}", to_json(&created)?);
        }
        Command::Execute { user, action, params } => {
            let value: serde_json::Value = serde_json::from_str(&params)
                .map_err(|e| WalletError::invalid_param("params", format!("not valid JSON: {}", e)))?;
            let result = service
                .execute_action(parse_user(&user)?, &action, &ActionParams::from_json(value)?)
                .await?;
            println!("{}", to_json(&result)?);
        }
        Command::Call {
            user,
            function,
            arguments,
        } => {
            let reply = agent_tools::handle_function_call(&service, parse_user(&user)?, &function, &arguments).await;
            println!("{}", reply);
        }
        Command::Info { user } => {
            println!("{}", to_json(&service.get_wallet_info(parse_user(&user)?)?)?);
        }
        Command::ResumeSeeding {
            user,
            kind,
            authorizer,
            step,
        } => {
            let step: SeedingStep = step
                .parse()
                .map_err(|_| WalletError::invalid_param("step", format!("unknown seeding step '{}'", step)))?;
            service
                .resume_seeding(
                    parse_user(&user)?,
                    AuthorizerKind::parse(&kind)?,
                    config::parse_address("authorizer", &authorizer)?,
                    step,
                )
                .await?;
            println!("Seeding of {} completed", authorizer);
        }
        Command::RewireRole { user, kind, authorizer } => {
            let result = service
                .rewire_role(
                    parse_user(&user)?,
                    AuthorizerKind::parse(&kind)?,
                    config::parse_address("authorizer", &authorizer)?,
                )
                .await?
                .require_success()?;
            println!("{}", to_json(&result)?);
        }
        Command::Describe | Command::Tools => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    log::info!("argus-backend v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error ({}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}
