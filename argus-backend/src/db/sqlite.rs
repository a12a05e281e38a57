//! SQLite database - schema definitions and connection management
//!
//! This file contains:
//! - Database struct definition
//! - Connection pool management (r2d2)
//! - Schema creation
//!
//! Table operations are in the tables/ subdirectory.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use crate::error::WalletError;

/// Pooled connection type alias for convenience
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Main database wrapper with r2d2 connection pool
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Create a new database connection pool and initialize schema
    pub fn new(database_url: &str) -> Result<Self, WalletError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let manager = SqliteConnectionManager::file(database_url).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
        });

        // SQLite handles concurrency via WAL, so we don't need many connections
        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self { pool };
        db.init()?;

        log::info!("[DB] Opened wallet database at {}", database_url);
        Ok(db)
    }

    /// Get a connection from the pool
    #[inline]
    pub fn conn(&self) -> Result<DbConn, WalletError> {
        Ok(self.pool.get()?)
    }

    fn init(&self) -> Result<(), WalletError> {
        let conn = self.conn()?;

        // One row per end user. delegate_module_address stays NULL until the
        // Argus module is attached; agent_key is written once at creation.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallets (
                user_address TEXT PRIMARY KEY,
                wallet_address TEXT NOT NULL,
                delegate_module_address TEXT,
                agent_address TEXT NOT NULL,
                agent_key TEXT NOT NULL,
                ownership_transferred INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Authorizers are written only once role wiring and seeding finished
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_authorizers (
                user_address TEXT NOT NULL REFERENCES wallets(user_address),
                kind TEXT NOT NULL,
                authorizer_address TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_address, kind)
            )",
            [],
        )?;

        Ok(())
    }
}
