pub mod multisend;
pub mod signer;
pub mod types;

pub use signer::TransactionSigner;
pub use types::{CallData, Operation, TransactionResult};
