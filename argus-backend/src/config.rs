use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::env;
use std::time::Duration;

use crate::error::WalletError;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const RPC_URL: &str = "RPC_URL";
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Controller (deployer) key. Owns every Safe until ownership is handed to the user.
    pub const DEPLOYER_PRIVATE_KEY: &str = "DEPLOYER_PRIVATE_KEY";
    /// Optional; when set it must match the address of DEPLOYER_PRIVATE_KEY.
    pub const DEPLOYER_ADDRESS: &str = "DEPLOYER_ADDRESS";
    /// BIP-39 phrase agent keys are derived from.
    pub const AGENT_MNEMONIC: &str = "AGENT_MNEMONIC";
    pub const SAFE_FACTORY_ADDRESS: &str = "SAFE_FACTORY_ADDRESS";
    pub const SAFE_SINGLETON_ADDRESS: &str = "SAFE_SINGLETON_ADDRESS";
    pub const FALLBACK_HANDLER_ADDRESS: &str = "FALLBACK_HANDLER_ADDRESS";
    pub const COBO_FACTORY_ADDRESS: &str = "COBO_FACTORY_ADDRESS";
    pub const ARGUS_HELPER_ADDRESS: &str = "ARGUS_HELPER_ADDRESS";
    pub const MULTISEND_ADDRESS: &str = "MULTISEND_ADDRESS";
    pub const APPROVE_AUTHORIZER_IMPL: &str = "APPROVE_AUTHORIZER_IMPL";
    pub const SILO_AUTHORIZER_IMPL: &str = "SILO_AUTHORIZER_IMPL";
    pub const RECEIPT_TIMEOUT_SECS: &str = "RECEIPT_TIMEOUT_SECS";
    pub const RECEIPT_POLL_MS: &str = "RECEIPT_POLL_MS";
    /// Set to "false" or "0" to keep the controller as Safe owner after provisioning.
    pub const TRANSFER_OWNERSHIP_TO_USER: &str = "TRANSFER_OWNERSHIP_TO_USER";
    /// Comma-separated overrides for the authorizer seed lists
    pub const INITIAL_CONTRACTS: &str = "INITIAL_CONTRACTS";
    pub const INITIAL_SPENDERS: &str = "INITIAL_SPENDERS";
    pub const INITIAL_SILOS: &str = "INITIAL_SILOS";
}

/// Default values (Sonic mainnet deployment)
pub mod defaults {
    pub const RPC_URL: &str = "https://rpc.soniclabs.com";
    pub const CHAIN_ID: u64 = 146;
    pub const DATABASE_URL: &str = "./.db/wallets.db";

    pub const SAFE_FACTORY_ADDRESS: &str = "0x4e1DCf7AD4e460CfD30791CCC4F9c8a4f820ec67";
    pub const SAFE_SINGLETON_ADDRESS: &str = "0x29fcB43b46531BcA003ddC8FCB67FFE91900C762";
    pub const FALLBACK_HANDLER_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
    pub const COBO_FACTORY_ADDRESS: &str = "0x14149ab9476c12ab55ef6831cbE973B77De7f2Ac";
    pub const ARGUS_HELPER_ADDRESS: &str = "0xBBb7412f5dAc3Ed358C42E34b51BA2256fb3EB17";
    pub const MULTISEND_ADDRESS: &str = "0x38869bf66a61cF6bDB996A6aE40D5853Fd43B526";

    pub const APPROVE_AUTHORIZER_IMPL: &str = "0x65949fD26c04DbA182F1B8C277A4BfA4fC77dACa";
    pub const SILO_AUTHORIZER_IMPL: &str = "0x425ab37703a7eE412e8187505055c82870D60B65";

    pub const SILO_ROUTER: &str = "0x22AacdEc57b13911dE9f188CF69633cC537BdB76";
    pub const WRAPPED_NATIVE: &str = "0x039e2fB66102314Ce7b64Ce5Ce3E5183bc94aD38";
    pub const SILO_LENS: &str = "0xE05966aee69CeCD677a30f469812Ced650cE3b5E";
    pub const CROWDFUNDING: &str = "0x9303a680bA1A2924Bb6EeE5A7eD804df2E1824f7";

    pub const RECEIPT_TIMEOUT_SECS: u64 = 120;
    pub const RECEIPT_POLL_MS: u64 = 2000;

    pub const DEPLOY_GAS: u64 = 2_000_000;
    pub const WALLET_EXEC_GAS: u64 = 600_000;
    pub const MODULE_EXEC_GAS: u64 = 800_000;

    /// USDC.e, wS, stS
    pub const INITIAL_CONTRACTS: &[&str] = &[
        "0x29219dd400f2Bf60E5a23d13Be72B486D4038894",
        "0x039e2fB66102314Ce7b64Ce5Ce3E5183bc94aD38",
        "0xE5DA20F15420aD15DE0fa650600aFc998bbE3955",
    ];

    /// SiloRouter, PermitWagmi
    pub const INITIAL_SPENDERS: &[&str] = &[
        "0x22AacdEc57b13911dE9f188CF69633cC537BdB76",
        "0x7Ac9E324c2a211a389fac64b773433A17dB22948",
    ];

    /// USDC.e/wS, USDC.e/wS, stS/wS
    pub const INITIAL_SILOS: &[&str] = &[
        "0xE223C8e92AA91e966CA31d5C6590fF7167E25801",
        "0xf55902DE87Bd80c6a35614b48d7f8B612a083C12",
        "0x47d8490Be37ADC7Af053322d6d779153689E13C1",
    ];
}

/// Parse a hex address, naming the setting in the error
pub fn parse_address(name: &str, value: &str) -> Result<Address, WalletError> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| WalletError::Config(format!("{} is not a valid address ({}): {}", name, value, e)))
}

/// Parse a raw hex private key into a signer
pub fn parse_private_key(private_key: &str) -> Result<LocalWallet, WalletError> {
    let key_hex = private_key.trim().strip_prefix("0x").unwrap_or(private_key.trim());
    let key_bytes = hex::decode(key_hex)
        .map_err(|e| WalletError::Key(format!("Invalid private key hex: {}", e)))?;

    let signing_key = SigningKey::from_slice(&key_bytes)
        .map_err(|e| WalletError::Key(format!("Invalid private key: {}", e)))?;

    Ok(LocalWallet::from(signing_key))
}

fn env_address(name: &str, default: &str) -> Result<Address, WalletError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    parse_address(name, &value)
}

fn env_address_list(name: &str, default: &[&str]) -> Result<Vec<Address>, WalletError> {
    match env::var(name) {
        Ok(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_address(name, s))
            .collect(),
        Err(_) => default.iter().map(|s| parse_address(name, s)).collect(),
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64, WalletError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| WalletError::Config(format!("{} must be a valid number", name))),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"),
        Err(_) => default,
    }
}

/// Infrastructure contracts used during provisioning
#[derive(Clone, Debug)]
pub struct ContractAddresses {
    pub safe_factory: Address,
    pub safe_singleton: Address,
    pub fallback_handler: Address,
    pub cobo_factory: Address,
    pub argus_helper: Address,
    pub multisend: Address,
    pub approve_authorizer_impl: Address,
    pub silo_authorizer_impl: Address,
}

/// Contracts the call builders target
#[derive(Clone, Debug)]
pub struct ProtocolAddresses {
    pub silo_router: Address,
    pub wrapped_native: Address,
    pub silo_lens: Address,
    pub crowdfunding: Address,
}

/// Allow-list entries written into freshly deployed authorizers
#[derive(Clone, Debug)]
pub struct SeedLists {
    pub contracts: Vec<Address>,
    pub spenders: Vec<Address>,
    pub silos: Vec<Address>,
}

#[derive(Clone, Debug)]
pub struct GasLimits {
    pub deploy: u64,
    pub wallet_exec: u64,
    pub module_exec: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            deploy: defaults::DEPLOY_GAS,
            wallet_exec: defaults::WALLET_EXEC_GAS,
            module_exec: defaults::MODULE_EXEC_GAS,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub database_url: String,
    pub controller_key: LocalWallet,
    pub agent_mnemonic: Option<String>,
    pub contracts: ContractAddresses,
    pub protocols: ProtocolAddresses,
    pub seeds: SeedLists,
    pub gas: GasLimits,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub transfer_ownership_to_user: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("database_url", &self.database_url)
            .field("controller", &self.controller_address())
            .field("agent_mnemonic", &self.agent_mnemonic.as_ref().map(|_| "<redacted>"))
            .field("contracts", &self.contracts)
            .field("protocols", &self.protocols)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, WalletError> {
        let key = env::var(env_vars::DEPLOYER_PRIVATE_KEY).map_err(|_| {
            WalletError::Config(format!("{} is required", env_vars::DEPLOYER_PRIVATE_KEY))
        })?;
        let chain_id = env_u64(env_vars::CHAIN_ID, defaults::CHAIN_ID)?;
        let controller_key = parse_private_key(&key)?.with_chain_id(chain_id);

        // The address is always derived from the key; a configured one only cross-checks it
        if let Ok(declared) = env::var(env_vars::DEPLOYER_ADDRESS) {
            let declared = parse_address(env_vars::DEPLOYER_ADDRESS, &declared)?;
            if declared != controller_key.address() {
                return Err(WalletError::Config(format!(
                    "{} {:?} does not match the address of {} ({:?})",
                    env_vars::DEPLOYER_ADDRESS,
                    declared,
                    env_vars::DEPLOYER_PRIVATE_KEY,
                    controller_key.address()
                )));
            }
        }

        let agent_mnemonic = env::var(env_vars::AGENT_MNEMONIC)
            .ok()
            .filter(|m| !m.trim().is_empty());
        if agent_mnemonic.is_none() {
            log::warn!("{} not set - wallet creation will fail until it is configured", env_vars::AGENT_MNEMONIC);
        }

        Ok(Self {
            rpc_url: env::var(env_vars::RPC_URL).unwrap_or_else(|_| defaults::RPC_URL.to_string()),
            chain_id,
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            controller_key,
            agent_mnemonic,
            contracts: ContractAddresses {
                safe_factory: env_address(env_vars::SAFE_FACTORY_ADDRESS, defaults::SAFE_FACTORY_ADDRESS)?,
                safe_singleton: env_address(env_vars::SAFE_SINGLETON_ADDRESS, defaults::SAFE_SINGLETON_ADDRESS)?,
                fallback_handler: env_address(env_vars::FALLBACK_HANDLER_ADDRESS, defaults::FALLBACK_HANDLER_ADDRESS)?,
                cobo_factory: env_address(env_vars::COBO_FACTORY_ADDRESS, defaults::COBO_FACTORY_ADDRESS)?,
                argus_helper: env_address(env_vars::ARGUS_HELPER_ADDRESS, defaults::ARGUS_HELPER_ADDRESS)?,
                multisend: env_address(env_vars::MULTISEND_ADDRESS, defaults::MULTISEND_ADDRESS)?,
                approve_authorizer_impl: env_address(env_vars::APPROVE_AUTHORIZER_IMPL, defaults::APPROVE_AUTHORIZER_IMPL)?,
                silo_authorizer_impl: env_address(env_vars::SILO_AUTHORIZER_IMPL, defaults::SILO_AUTHORIZER_IMPL)?,
            },
            protocols: ProtocolAddresses::default_addresses()?,
            seeds: SeedLists {
                contracts: env_address_list(env_vars::INITIAL_CONTRACTS, defaults::INITIAL_CONTRACTS)?,
                spenders: env_address_list(env_vars::INITIAL_SPENDERS, defaults::INITIAL_SPENDERS)?,
                silos: env_address_list(env_vars::INITIAL_SILOS, defaults::INITIAL_SILOS)?,
            },
            gas: GasLimits::default(),
            receipt_timeout: Duration::from_secs(env_u64(
                env_vars::RECEIPT_TIMEOUT_SECS,
                defaults::RECEIPT_TIMEOUT_SECS,
            )?),
            receipt_poll_interval: Duration::from_millis(env_u64(
                env_vars::RECEIPT_POLL_MS,
                defaults::RECEIPT_POLL_MS,
            )?),
            transfer_ownership_to_user: env_flag(env_vars::TRANSFER_OWNERSHIP_TO_USER, true),
        })
    }

    /// Address of the controller (deployer) key
    pub fn controller_address(&self) -> Address {
        self.controller_key.address()
    }
}

impl ProtocolAddresses {
    pub fn default_addresses() -> Result<Self, WalletError> {
        Ok(Self {
            silo_router: parse_address("silo_router", defaults::SILO_ROUTER)?,
            wrapped_native: parse_address("wrapped_native", defaults::WRAPPED_NATIVE)?,
            silo_lens: parse_address("silo_lens", defaults::SILO_LENS)?,
            crowdfunding: parse_address("crowdfunding", defaults::CROWDFUNDING)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_private_key_derives_known_address() {
        // Well-known first Hardhat/Anvil account
        let wallet = parse_private_key(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        assert_eq!(
            format!("{:?}", wallet.address()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_parse_private_key_rejects_garbage() {
        assert!(matches!(parse_private_key("0xnothex"), Err(WalletError::Key(_))));
        assert!(matches!(parse_private_key("0x1234"), Err(WalletError::Key(_))));
    }

    #[test]
    fn test_default_addresses_parse() {
        for s in defaults::INITIAL_CONTRACTS
            .iter()
            .chain(defaults::INITIAL_SPENDERS)
            .chain(defaults::INITIAL_SILOS)
        {
            assert!(parse_address("seed", s).is_ok(), "bad default {}", s);
        }
        assert!(ProtocolAddresses::default_addresses().is_ok());
    }
}
