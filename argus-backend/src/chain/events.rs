//! Address recovery from deployment receipts.
//!
//! Deployed proxy addresses are never derived client-side; the emitted event
//! is the only source of truth. A receipt without the expected topic means the
//! deployment executed but cannot be linked to an address.

use ethers::types::{Address, Log, TransactionReceipt, H256};
use ethers::utils::{keccak256, to_checksum};
use once_cell::sync::Lazy;

use crate::error::WalletError;

/// Where the deployed address sits inside the matching log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressLocation {
    /// Last 20 bytes of `topics[n]`
    Topic(usize),
    /// Last 20 bytes of the log data
    DataTail,
    /// `topics[1]` when the address is indexed, otherwise the first data word
    IndexedOrFirstWord,
}

#[derive(Debug, Clone)]
pub struct DeploymentEvent {
    pub name: &'static str,
    pub topic0: H256,
    pub location: AddressLocation,
}

/// SafeProxyFactory `ProxyCreation(address proxy, address singleton)`.
/// The proxy argument is indexed from Safe v1.4 onwards.
pub static PROXY_CREATION: Lazy<DeploymentEvent> = Lazy::new(|| DeploymentEvent {
    name: "ProxyCreation",
    topic0: H256::from(keccak256("ProxyCreation(address,address)")),
    location: AddressLocation::IndexedOrFirstWord,
});

/// topic0 of the Cobo factory's `ArgusInitialized` event
const ARGUS_INITIALIZED_TOPIC: H256 = H256([
    0xd9, 0x83, 0x15, 0xa3, 0x88, 0x19, 0xf8, 0x5a,
    0x09, 0x14, 0x49, 0x8f, 0xdc, 0x92, 0x73, 0x7e,
    0x16, 0x29, 0x74, 0x53, 0x01, 0x7a, 0x69, 0xca,
    0x22, 0x23, 0x31, 0xe8, 0x36, 0x44, 0xe7, 0x39,
]);

/// topic0 of the Cobo factory's `ProxyCreated` event
const PROXY_CREATED_TOPIC: H256 = H256([
    0x53, 0x2c, 0xf4, 0x63, 0x5a, 0xe9, 0xff, 0x4e,
    0x1e, 0x42, 0xba, 0x14, 0x91, 0x7e, 0x82, 0x5d,
    0x00, 0xf6, 0x02, 0xf2, 0x82, 0x97, 0xcc, 0x65,
    0x4f, 0xa3, 0xb4, 0x14, 0xb9, 0x11, 0x23, 0x2b,
]);

/// Cobo Argus factory, emitted when a CoboSafeAccount is initialized for a Safe
pub static ARGUS_INITIALIZED: Lazy<DeploymentEvent> = Lazy::new(|| DeploymentEvent {
    name: "ArgusInitialized",
    topic0: ARGUS_INITIALIZED_TOPIC,
    location: AddressLocation::Topic(1),
});

/// Cobo factory, emitted for every authorizer proxy
pub static PROXY_CREATED: Lazy<DeploymentEvent> = Lazy::new(|| DeploymentEvent {
    name: "ProxyCreated",
    topic0: PROXY_CREATED_TOPIC,
    location: AddressLocation::DataTail,
});

fn last_20(bytes: &[u8]) -> Option<Address> {
    if bytes.len() < 20 {
        return None;
    }
    Some(Address::from_slice(&bytes[bytes.len() - 20..]))
}

fn address_in_log(log: &Log, location: AddressLocation) -> Option<Address> {
    match location {
        AddressLocation::Topic(n) => log.topics.get(n).and_then(|t| last_20(t.as_bytes())),
        AddressLocation::DataTail => last_20(&log.data),
        AddressLocation::IndexedOrFirstWord => match log.topics.get(1) {
            Some(topic) => last_20(topic.as_bytes()),
            None if log.data.len() >= 32 => last_20(&log.data[..32]),
            None => None,
        },
    }
}

/// Find the first log whose topic0 matches `event` and pull the address out of it
pub fn recover_address(receipt: &TransactionReceipt, event: &DeploymentEvent) -> Result<Address, WalletError> {
    for log in &receipt.logs {
        if log.topics.first() != Some(&event.topic0) {
            continue;
        }
        if let Some(address) = address_in_log(log, event.location) {
            log::info!(
                "[Events] {} in {:?} -> {}",
                event.name,
                receipt.transaction_hash,
                to_checksum(&address, None)
            );
            return Ok(address);
        }
    }

    log::warn!(
        "[Events] {} not found among {} logs of {:?}",
        event.name,
        receipt.logs.len(),
        receipt.transaction_hash
    );
    Err(WalletError::DeploymentEventNotFound {
        event: event.name,
        tx_hash: receipt.transaction_hash,
    })
}

/// EIP-55 form, for user-facing output
pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}
