//! Wallet record operations
//!
//! The record count doubles as the agent derivation index; records are never
//! deleted, so the index is strictly increasing.

use chrono::{DateTime, Utc};
use ethers::types::Address;
use rusqlite::types::Type;
use rusqlite::{params, ErrorCode, OptionalExtension, Row, TransactionBehavior};

use crate::db::Database;
use crate::error::WalletError;
use crate::keys::KeyDerivationService;
use crate::models::WalletRecord;

/// Lowercase 0x-hex form used as the storage key
pub(super) fn address_key(address: &Address) -> String {
    format!("{:?}", address)
}

pub(super) fn parse_address_column(idx: usize, value: String) -> rusqlite::Result<Address> {
    value
        .parse::<Address>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<WalletRecord> {
    let delegate: Option<String> = row.get(2)?;
    let created_at_str: String = row.get(6)?;

    Ok(WalletRecord {
        user_address: parse_address_column(0, row.get(0)?)?,
        wallet_address: parse_address_column(1, row.get(1)?)?,
        delegate_module_address: delegate.map(|d| parse_address_column(2, d)).transpose()?,
        agent_address: parse_address_column(3, row.get(3)?)?,
        agent_key: row.get(4)?,
        ownership_transferred: row.get(5)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?
            .with_timezone(&Utc),
    })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

impl Database {
    /// Create the record for `user`, deriving a fresh agent key in the same
    /// transaction. Nothing is written if any step fails.
    pub fn create_wallet_record(
        &self,
        keys: &KeyDerivationService,
        user: Address,
        wallet_address: Address,
    ) -> Result<WalletRecord, WalletError> {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front so two creators can't read the same count
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM wallets WHERE user_address = ?1",
            params![address_key(&user)],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(WalletError::DuplicateWallet(user));
        }

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM wallets", [], |row| row.get(0))?;
        let index = u32::try_from(count)
            .map_err(|_| WalletError::Key(format!("Derivation index {} out of range", count)))?;

        let agent = keys.derive(index)?;
        let created_at = Utc::now();

        tx.execute(
            "INSERT INTO wallets (user_address, wallet_address, delegate_module_address, agent_address, agent_key, created_at)
             VALUES (?1, ?2, NULL, ?3, ?4, ?5)",
            params![
                address_key(&user),
                address_key(&wallet_address),
                address_key(&agent.address),
                agent.private_key,
                created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                WalletError::DuplicateWallet(user)
            } else {
                WalletError::Database(e)
            }
        })?;

        tx.commit()?;

        log::info!(
            "[DB] Created wallet record for {:?}: wallet={:?} agent={:?} (index {})",
            user,
            wallet_address,
            agent.address,
            index
        );

        Ok(WalletRecord {
            user_address: user,
            wallet_address,
            delegate_module_address: None,
            agent_address: agent.address,
            agent_key: agent.private_key,
            ownership_transferred: false,
            created_at,
        })
    }

    /// Record the delegate module attached to the user's wallet (overwrites)
    pub fn set_delegate_module(&self, user: Address, module_address: Address) -> Result<(), WalletError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE wallets SET delegate_module_address = ?1 WHERE user_address = ?2",
            params![address_key(&module_address), address_key(&user)],
        )?;
        if updated == 0 {
            return Err(WalletError::WalletNotFound(user));
        }

        tx.commit()?;
        log::info!("[DB] Delegate module for {:?} set to {:?}", user, module_address);
        Ok(())
    }

    /// Flag the Safe as handed over to its user
    pub fn mark_ownership_transferred(&self, user: Address) -> Result<(), WalletError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE wallets SET ownership_transferred = 1 WHERE user_address = ?1",
            params![address_key(&user)],
        )?;
        if updated == 0 {
            return Err(WalletError::WalletNotFound(user));
        }
        log::info!("[DB] Ownership of {:?}'s wallet marked as transferred", user);
        Ok(())
    }

    pub fn get_wallet(&self, user: Address) -> Result<WalletRecord, WalletError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT user_address, wallet_address, delegate_module_address, agent_address, agent_key,
                    ownership_transferred, created_at
             FROM wallets WHERE user_address = ?1",
            params![address_key(&user)],
            row_to_record,
        )
        .optional()?
        .ok_or(WalletError::WalletNotFound(user))
    }

    pub fn wallet_exists(&self, user: Address) -> Result<bool, WalletError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wallets WHERE user_address = ?1",
            params![address_key(&user)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_wallets(&self) -> Result<u64, WalletError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM wallets", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
