//! Snapshot & restore of pool accounting state
//!
//! A snapshot captures the running totals and every position. Positions are
//! sorted by account id so the encoding, and therefore the SHA-256 checksum,
//! is deterministic. Ledger balances are not part of the snapshot; the
//! ledgers are external and are handed back in on restore, where the pool
//! account's balances must match the recorded `pooled_primary` and
//! `reward_balance`. Restore also recomputes every running total from the
//! positions, so a snapshot that was edited and re-hashed is still refused.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{info, warn};
use types::ids::AccountId;
use types::numeric::{exact_bound, exact_sum, fits_precision, Amount, Shares};
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::errors::{PoolError, SnapshotError};
use crate::ledger::Ledger;
use crate::pool::{validate_setup, LiquidationPool, Position};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One account's position at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub account_id: AccountId,
    pub shares: Shares,
    pub negative_offset: Amount,
    pub positive_offset: Amount,
}

/// Pool accounting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub total_shares: Shares,
    pub pooled_primary: Amount,
    pub total_negative_offsets: Amount,
    pub total_positive_offsets: Amount,
    pub reward_balance: Amount,
    /// Sorted by account id
    pub positions: Vec<PositionSnapshot>,
}

impl PoolState {
    /// Deterministic SHA-256 hash of the JSON-encoded state.
    pub fn compute_hash(&self) -> Result<String, SnapshotError> {
        let bytes =
            serde_json::to_vec(self).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// A complete snapshot of the pool at a given event sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Snapshot format version for forward compatibility.
    pub version: u32,
    pub snapshot_id: Uuid,
    /// Last committed event sequence.
    pub sequence: u64,
    pub state: PoolState,
    /// SHA-256 hash of the serialized state.
    pub checksum: String,
}

impl PoolSnapshot {
    /// Create a new snapshot with computed integrity hash.
    pub fn new(sequence: u64, state: PoolState) -> Result<Self, SnapshotError> {
        let checksum = state.compute_hash()?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            snapshot_id: Uuid::now_v7(),
            sequence,
            state,
            checksum,
        })
    }

    /// Verify the snapshot's integrity hash.
    pub fn verify_integrity(&self) -> Result<(), SnapshotError> {
        let actual = self.state.compute_hash()?;
        if actual != self.checksum {
            return Err(SnapshotError::IntegrityFailure {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }
}

impl<L: Ledger> LiquidationPool<L> {
    /// Capture the current accounting state.
    pub fn snapshot(&self) -> Result<PoolSnapshot, SnapshotError> {
        let mut positions: Vec<PositionSnapshot> = self
            .positions
            .iter()
            .map(|(account_id, position)| PositionSnapshot {
                account_id: *account_id,
                shares: position.shares,
                negative_offset: position.negative_offset,
                positive_offset: position.positive_offset,
            })
            .collect();
        positions.sort_by_key(|p| p.account_id);

        let state = PoolState {
            total_shares: self.total_shares,
            pooled_primary: self.pooled_primary,
            total_negative_offsets: self.total_negative_offsets,
            total_positive_offsets: self.total_positive_offsets,
            reward_balance: self.reward_balance,
            positions,
        };
        PoolSnapshot::new(self.sequence, state)
    }

    /// Rebuild a pool from a snapshot and the external ledgers.
    ///
    /// The event log starts empty; sequencing continues from the snapshot.
    pub fn restore(
        config: PoolConfig,
        primary: L,
        reward: L,
        snapshot: &PoolSnapshot,
    ) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        snapshot.verify_integrity()?;
        validate_setup(&config, &primary, &reward)?;

        let state = &snapshot.state;
        let dp = config.precision;
        ensure_quantity("total_shares", state.total_shares, dp)?;
        ensure_quantity("pooled_primary", state.pooled_primary, dp)?;
        ensure_quantity("total_negative_offsets", state.total_negative_offsets, dp)?;
        ensure_quantity("total_positive_offsets", state.total_positive_offsets, dp)?;
        ensure_quantity("reward_balance", state.reward_balance, dp)?;

        let mut positions = HashMap::with_capacity(state.positions.len());
        let mut shares_sum = Decimal::ZERO;
        let mut negative_sum = Decimal::ZERO;
        let mut positive_sum = Decimal::ZERO;
        for entry in &state.positions {
            ensure_quantity("shares", entry.shares, dp)?;
            ensure_quantity("negative_offset", entry.negative_offset, dp)?;
            ensure_quantity("positive_offset", entry.positive_offset, dp)?;
            if entry.account_id == config.pool_account {
                return Err(PoolError::ReservedAccount {
                    account_id: entry.account_id.to_string(),
                }
                .into());
            }
            let position = Position {
                shares: entry.shares,
                negative_offset: entry.negative_offset,
                positive_offset: entry.positive_offset,
            };
            if positions.insert(entry.account_id, position).is_some() {
                return Err(SnapshotError::DuplicateAccount {
                    account_id: entry.account_id.to_string(),
                });
            }
            shares_sum = accumulate(shares_sum, entry.shares, dp)?;
            negative_sum = accumulate(negative_sum, entry.negative_offset, dp)?;
            positive_sum = accumulate(positive_sum, entry.positive_offset, dp)?;
        }

        ensure_total("total_shares", state.total_shares, shares_sum)?;
        ensure_total("total_negative_offsets", state.total_negative_offsets, negative_sum)?;
        ensure_total("total_positive_offsets", state.total_positive_offsets, positive_sum)?;
        ensure_ledger(
            "pooled_primary",
            state.pooled_primary,
            primary.balance_of(&config.pool_account),
        )?;
        ensure_ledger(
            "reward_balance",
            state.reward_balance,
            reward.balance_of(&config.pool_account),
        )?;

        info!(
            sequence = snapshot.sequence,
            accounts = positions.len(),
            "pool restored from snapshot"
        );

        Ok(Self {
            config,
            primary,
            reward,
            positions,
            total_shares: state.total_shares,
            pooled_primary: state.pooled_primary,
            total_negative_offsets: state.total_negative_offsets,
            total_positive_offsets: state.total_positive_offsets,
            reward_balance: state.reward_balance,
            events: Vec::new(),
            sequence: snapshot.sequence,
        })
    }
}

/// Non-negative, at most `dp` decimal places and below the exact bound.
fn ensure_quantity(field: &str, value: Decimal, dp: u32) -> Result<(), SnapshotError> {
    if value < Decimal::ZERO {
        return Err(SnapshotError::NegativeQuantity {
            field: field.to_string(),
        });
    }
    let within_bound = exact_bound(dp).is_some_and(|bound| value < bound);
    if !within_bound || !fits_precision(value, dp) {
        return Err(SnapshotError::PrecisionExceeded {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn accumulate(total: Decimal, value: Decimal, dp: u32) -> Result<Decimal, SnapshotError> {
    exact_sum(total, value, dp).ok_or(SnapshotError::Pool(PoolError::Overflow))
}

fn ensure_total(field: &str, recorded: Decimal, computed: Decimal) -> Result<(), SnapshotError> {
    if recorded != computed {
        warn!(field, %recorded, %computed, "snapshot total disagrees with positions");
        return Err(SnapshotError::InconsistentTotal {
            field: field.to_string(),
            recorded: recorded.to_string(),
            computed: computed.to_string(),
        });
    }
    Ok(())
}

fn ensure_ledger(field: &str, recorded: Decimal, ledger: Decimal) -> Result<(), SnapshotError> {
    if recorded != ledger {
        warn!(field, %recorded, %ledger, "snapshot disagrees with pool ledger balance");
        return Err(SnapshotError::LedgerMismatch {
            field: field.to_string(),
            recorded: recorded.to_string(),
            ledger: ledger.to_string(),
        });
    }
    Ok(())
}
