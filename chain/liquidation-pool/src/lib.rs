//! Liquidation Pool
//!
//! Proportional-ownership accounting for a pooled-deposit system. Depositors
//! hold shares of a pool of primary asset; liquidations swap pooled primary
//! for a reward asset that is distributed pro rata to shareholders in O(1)
//! per operation, using running totals and per-account offsets.
//!
//! # Modules
//! - `errors`: Ledger, pool and snapshot error types
//! - `events`: Pool events emitted by committed operations
//! - `config`: Pool and liquidator accounts, asset symbols, precision
//! - `ledger`: Balance-transfer trait and in-memory asset ledger
//! - `pool`: Share accounting, offsets, deposit/withdraw/liquidate/claim
//! - `snapshot`: Checksummed snapshot and restore of pool state
//! - `shared`: Mutex-guarded handle for multi-threaded callers

pub mod errors;
pub mod events;
pub mod config;
pub mod ledger;
pub mod pool;
pub mod snapshot;
pub mod shared;

pub use config::PoolConfig;
pub use errors::{LedgerError, PoolError, SnapshotError};
pub use ledger::{AssetLedger, Ledger};
pub use pool::{LiquidationPool, Position};
pub use shared::SharedPool;
pub use snapshot::{PoolSnapshot, SNAPSHOT_VERSION};
