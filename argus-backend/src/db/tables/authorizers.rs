//! Authorizers that finished deployment, role wiring and seeding

use chrono::Utc;
use ethers::types::Address;
use rusqlite::params;
use std::collections::BTreeMap;

use super::wallets::{address_key, parse_address_column};
use crate::db::Database;
use crate::error::WalletError;
use crate::provisioning::AuthorizerKind;

impl Database {
    /// Record a fully set up authorizer of `kind` for `user`, replacing any earlier one
    pub fn record_authorizer(
        &self,
        user: Address,
        kind: AuthorizerKind,
        authorizer: Address,
    ) -> Result<(), WalletError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM wallets WHERE user_address = ?1",
            params![address_key(&user)],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(WalletError::WalletNotFound(user));
        }

        tx.execute(
            "INSERT INTO wallet_authorizers (user_address, kind, authorizer_address, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_address, kind) DO UPDATE SET
                authorizer_address = excluded.authorizer_address,
                created_at = excluded.created_at",
            params![
                address_key(&user),
                kind.to_string(),
                address_key(&authorizer),
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        log::info!("[DB] {} for {:?} recorded at {:?}", kind, user, authorizer);
        Ok(())
    }

    /// Authorizer kind name -> address, for every recorded authorizer of `user`
    pub fn get_authorizers(&self, user: Address) -> Result<BTreeMap<String, Address>, WalletError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT kind, authorizer_address FROM wallet_authorizers WHERE user_address = ?1 ORDER BY kind",
        )?;

        let rows = stmt.query_map(params![address_key(&user)], |row| {
            Ok((row.get::<_, String>(0)?, parse_address_column(1, row.get(1)?)?))
        })?;

        let mut authorizers = BTreeMap::new();
        for row in rows {
            let (kind, address) = row?;
            authorizers.insert(kind, address);
        }
        Ok(authorizers)
    }
}
