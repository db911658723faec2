//! Error types for the ledger, pool and snapshot layers
//!
//! Decimal quantities are carried as strings so that errors stay `PartialEq`
//! and print exactly what the caller passed in.

use thiserror::Error;

/// Asset ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient {asset} balance for {account_id}: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        account_id: String,
        required: String,
        available: String,
    },

    #[error("Transfer amount must not be negative: {amount}")]
    InvalidAmount { amount: String },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Pool operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Insufficient share balance: requested {requested}, redeemable {available}")]
    InsufficientShareBalance { requested: String, available: String },

    #[error("Liquidation exceeds pooled primary: required {required}, pooled {available}")]
    LiquidationExceedsPool { required: String, available: String },

    #[error("Pool has no outstanding shares")]
    EmptyPool,

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: String },

    #[error("Arithmetic overflow in pool accounting")]
    Overflow,

    #[error("Account {account_id} is reserved for the pool")]
    ReservedAccount { account_id: String },

    #[error("Invalid pool configuration: {reason}")]
    Config { reason: String },

    #[error("Pool lock poisoned")]
    LockPoisoned,
}

/// Snapshot encoding and restore errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Integrity check failed: expected {expected}, got {actual}")]
    IntegrityFailure { expected: String, actual: String },

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("Duplicate account in snapshot: {account_id}")]
    DuplicateAccount { account_id: String },

    #[error("Negative {field} in snapshot")]
    NegativeQuantity { field: String },

    #[error("{field} in snapshot does not fit the pool precision")]
    PrecisionExceeded { field: String },

    #[error("Inconsistent {field} in snapshot: recorded {recorded}, positions sum to {computed}")]
    InconsistentTotal {
        field: String,
        recorded: String,
        computed: String,
    },

    #[error("Snapshot {field} is {recorded} but the pool holds {ledger} on the ledger")]
    LedgerMismatch {
        field: String,
        recorded: String,
        ledger: String,
    },

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}
