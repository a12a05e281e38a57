//! Table operations - each module holds `impl Database` blocks for one table

mod authorizers;
mod wallets;
