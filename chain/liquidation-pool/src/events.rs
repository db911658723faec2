//! Pool events
//!
//! Events are immutable records of committed pool operations. Every
//! operation that changes pool state returns its event and appends it to the
//! pool's log with the next sequence number.

use serde::{Deserialize, Serialize};
use types::ids::AccountId;
use types::numeric::{Amount, Shares};

/// Primary asset deposited and shares minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
    pub sequence: u64,
    pub account_id: AccountId,
    pub amount: Amount,
    pub shares_minted: Shares,
    /// Reward already accrued to existing shares, deducted from the depositor
    pub reward_offset: Amount,
}

/// Primary asset redeemed and shares burned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryWithdrawn {
    pub sequence: u64,
    pub account_id: AccountId,
    pub amount: Amount,
    pub shares_burned: Shares,
    /// Reward earned by the burned shares, kept claimable by the account
    pub reward_credit: Amount,
}

/// Liquidation absorbed: primary paid out, reward received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationAbsorbed {
    pub sequence: u64,
    pub primary_paid: Amount,
    pub reward_received: Amount,
    pub pooled_primary_after: Amount,
}

/// Reward paid out to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsClaimed {
    pub sequence: u64,
    pub account_id: AccountId,
    pub amount: Amount,
}

/// Enum wrapper for all pool events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    Deposited(Deposited),
    PrimaryWithdrawn(PrimaryWithdrawn),
    LiquidationAbsorbed(LiquidationAbsorbed),
    RewardsClaimed(RewardsClaimed),
}

impl PoolEvent {
    pub fn sequence(&self) -> u64 {
        match self {
            PoolEvent::Deposited(e) => e.sequence,
            PoolEvent::PrimaryWithdrawn(e) => e.sequence,
            PoolEvent::LiquidationAbsorbed(e) => e.sequence,
            PoolEvent::RewardsClaimed(e) => e.sequence,
        }
    }

    /// Account the event belongs to, `None` for pool-wide events.
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            PoolEvent::Deposited(e) => Some(e.account_id),
            PoolEvent::PrimaryWithdrawn(e) => Some(e.account_id),
            PoolEvent::LiquidationAbsorbed(_) => None,
            PoolEvent::RewardsClaimed(e) => Some(e.account_id),
        }
    }
}
