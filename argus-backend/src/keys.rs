//! Deterministic agent key derivation.
//!
//! Keys come from the configured BIP-39 mnemonic along
//! `m/44'/60'/0'/0/{index}`. Derivation is a pure function of phrase and index;
//! callers must never reuse an index.

use ethers::signers::coins_bip39::English;
use ethers::signers::{LocalWallet, MnemonicBuilder, Signer};
use ethers::types::Address;

use crate::error::WalletError;

/// A derived agent credential
pub struct AgentKey {
    pub index: u32,
    pub address: Address,
    /// 0x-prefixed hex private key
    pub private_key: String,
}

impl std::fmt::Debug for AgentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentKey")
            .field("index", &self.index)
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct KeyDerivationService {
    mnemonic: Option<String>,
}

impl KeyDerivationService {
    pub fn new(mnemonic: Option<String>) -> Self {
        Self { mnemonic }
    }

    pub fn is_configured(&self) -> bool {
        self.mnemonic.is_some()
    }

    /// Derive the agent key at `index`
    pub fn derive(&self, index: u32) -> Result<AgentKey, WalletError> {
        let phrase = self.mnemonic.as_deref().ok_or(WalletError::SeedNotConfigured)?;

        let wallet: LocalWallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .index(index)
            .map_err(|e| WalletError::Key(format!("Invalid derivation index {}: {}", index, e)))?
            .build()
            .map_err(|e| WalletError::Key(format!("Failed to derive agent key: {}", e)))?;

        Ok(AgentKey {
            index,
            address: wallet.address(),
            private_key: format!("0x{}", hex::encode(wallet.signer().to_bytes())),
        })
    }
}
