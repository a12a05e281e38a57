pub mod wallet_record;

pub use wallet_record::{WalletInfo, WalletRecord};
