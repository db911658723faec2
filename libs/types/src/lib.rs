//! Types library for the liquidation pool
//!
//! Shared value types used by the ledger and pool crates.
//!
//! # Modules
//! - `ids`: Account identifiers
//! - `numeric`: Decimal amount/share aliases and checked arithmetic helpers

pub mod ids;
pub mod numeric;
