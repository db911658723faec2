//! Liquidation pool: share accounting and O(1) reward distribution
//!
//! Depositors hold shares of the pooled primary asset. Liquidations remove
//! primary from the pool and add reward; the reward belongs to whoever held
//! shares at that moment.
//!
//! Instead of walking every position on each liquidation, the pool keeps
//! three running totals and derives
//!
//! ```text
//! virtual_collateral = reward_balance + total_negative_offsets - total_positive_offsets
//! entitlement(a)     = shares(a) / total_shares * virtual_collateral
//!                      + positive_offset(a) - negative_offset(a)
//! ```
//!
//! A deposit records the slice of virtual collateral its new shares would
//! otherwise inherit as a negative offset. A withdrawal records the slice its
//! burned shares had earned as a positive offset. A claim records the payout
//! as a negative offset. Only the acting account's position is touched.
//!
//! All stored quantities are kept at `PoolConfig::precision` decimal places,
//! so sums and differences are exact; one that would lose a digit fails with
//! `PoolError::Overflow` instead. Products and quotients round in the
//! pool's favour: shares minted and reward credited round down, shares burned
//! and deposit offsets round up.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};
use types::ids::AccountId;
use types::numeric::{
    exact_diff, exact_sum, fits_precision, mul_div_ceil, mul_div_floor, Amount, Shares,
    MAX_PRECISION,
};

use crate::config::PoolConfig;
use crate::errors::PoolError;
use crate::events::{Deposited, LiquidationAbsorbed, PoolEvent, PrimaryWithdrawn, RewardsClaimed};
use crate::ledger::{AssetLedger, Ledger};

/// Per-account pool state. Absent accounts read as all zero.
///
/// Offsets are never negative; rounding dust below zero is clamped away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub shares: Shares,
    /// Reward the account must not receive (pre-deposit accrual, past claims)
    pub negative_offset: Amount,
    /// Reward earned by shares the account has since burned
    pub positive_offset: Amount,
}

/// Pooled-deposit liquidation pool over a primary and a reward ledger.
#[derive(Debug, Clone)]
pub struct LiquidationPool<L: Ledger = AssetLedger> {
    pub(crate) config: PoolConfig,
    pub(crate) primary: L,
    pub(crate) reward: L,
    pub(crate) positions: HashMap<AccountId, Position>,
    pub(crate) total_shares: Shares,
    pub(crate) pooled_primary: Amount,
    pub(crate) total_negative_offsets: Amount,
    pub(crate) total_positive_offsets: Amount,
    /// Reward held by the pool and not yet paid out
    pub(crate) reward_balance: Amount,
    /// Emitted events log (append-only)
    pub(crate) events: Vec<PoolEvent>,
    /// Last assigned event sequence
    pub(crate) sequence: u64,
}

impl<L: Ledger> LiquidationPool<L> {
    /// Create an empty pool over the given ledgers.
    pub fn new(config: PoolConfig, primary: L, reward: L) -> Result<Self, PoolError> {
        validate_setup(&config, &primary, &reward)?;
        Ok(Self {
            config,
            primary,
            reward,
            positions: HashMap::new(),
            total_shares: Decimal::ZERO,
            pooled_primary: Decimal::ZERO,
            total_negative_offsets: Decimal::ZERO,
            total_positive_offsets: Decimal::ZERO,
            reward_balance: Decimal::ZERO,
            events: Vec::new(),
            sequence: 0,
        })
    }

    // ───────────────────────── Deposit ─────────────────────────

    /// Deposit `amount` of primary asset and mint shares at the current rate.
    ///
    /// The reward already accrued to existing shares is recorded as a
    /// negative offset so the depositor starts with a zero entitlement.
    pub fn deposit(&mut self, account_id: AccountId, amount: Amount) -> Result<Deposited, PoolError> {
        self.ensure_holder(&account_id)?;
        self.ensure_positive(amount)?;
        let dp = self.config.precision;

        let shares_minted = if self.pooled_primary.is_zero() {
            amount
        } else {
            checked(mul_div_floor(amount, self.total_shares, self.pooled_primary, dp))?
        };
        if shares_minted.is_zero() {
            warn!(%account_id, %amount, "deposit too small to mint a share");
            return Err(PoolError::InvalidAmount {
                amount: amount.to_string(),
            });
        }
        let collateral = self.virtual_collateral()?;
        let reward_offset = if self.total_shares > Decimal::ZERO {
            checked(mul_div_ceil(collateral, shares_minted, self.total_shares, dp))?
        } else {
            collateral
        }
        .max(Decimal::ZERO);

        let mut position = self.position(&account_id);
        position.shares = self.sum(position.shares, shares_minted)?;
        position.negative_offset = self.sum(position.negative_offset, reward_offset)?;
        let total_shares = self.sum(self.total_shares, shares_minted)?;
        let total_negative_offsets =
            self.sum(self.total_negative_offsets, reward_offset)?;
        let pooled_primary = self.sum(self.pooled_primary, amount)?;

        if let Err(err) = self
            .primary
            .transfer(&account_id, &self.config.pool_account, amount)
        {
            warn!(%account_id, %amount, error = %err, "deposit rejected by primary ledger");
            return Err(err.into());
        }

        self.positions.insert(account_id, position);
        self.total_shares = total_shares;
        self.total_negative_offsets = total_negative_offsets;
        self.pooled_primary = pooled_primary;

        debug!(%account_id, %shares_minted, %reward_offset, "deposit offsets recorded");
        info!(%account_id, %amount, "deposit committed");

        let event = Deposited {
            sequence: self.next_sequence(),
            account_id,
            amount,
            shares_minted,
            reward_offset,
        };
        self.events.push(PoolEvent::Deposited(event.clone()));
        Ok(event)
    }

    // ───────────────────────── Withdraw ─────────────────────────

    /// Redeem `amount` of primary asset by burning shares.
    ///
    /// Fails with `InsufficientShareBalance` if `amount` exceeds the account's
    /// redeemable balance by more than one unit at the pool's precision.
    /// Asking for the whole redeemable balance, or for what was deposited when
    /// rounding left the balance one unit short, is a full exit: every share
    /// is burned and the payout is capped at the pooled primary. The reward
    /// earned by the burned shares is kept as a positive offset and stays
    /// claimable.
    pub fn withdraw_primary(
        &mut self,
        account_id: AccountId,
        amount: Amount,
    ) -> Result<PrimaryWithdrawn, PoolError> {
        self.ensure_holder(&account_id)?;
        self.ensure_positive(amount)?;
        let dp = self.config.precision;

        let mut position = self.position(&account_id);
        let available = self.redeemable_balance(&account_id)?;
        let unit = Decimal::new(1, dp);
        if position.shares.is_zero()
            || self.pooled_primary.is_zero()
            || amount > self.sum(available, unit)?
        {
            warn!(%account_id, %amount, %available, "withdrawal exceeds redeemable balance");
            return Err(PoolError::InsufficientShareBalance {
                requested: amount.to_string(),
                available: available.to_string(),
            });
        }

        let (shares_burned, paid) = if amount >= available {
            (position.shares, amount.min(self.pooled_primary))
        } else {
            let needed = checked(mul_div_ceil(amount, self.total_shares, self.pooled_primary, dp))?;
            (needed.min(position.shares), amount)
        };
        let collateral = self.virtual_collateral()?;
        let reward_credit = checked(mul_div_floor(collateral, shares_burned, self.total_shares, dp))?
            .max(Decimal::ZERO);

        position.shares = self.diff(position.shares, shares_burned)?;
        position.positive_offset = self.sum(position.positive_offset, reward_credit)?;
        let total_shares = self.diff(self.total_shares, shares_burned)?;
        let total_positive_offsets =
            self.sum(self.total_positive_offsets, reward_credit)?;
        let pooled_primary = self.diff(self.pooled_primary, paid)?;

        if let Err(err) = self
            .primary
            .transfer(&self.config.pool_account, &account_id, paid)
        {
            warn!(%account_id, amount = %paid, error = %err, "withdrawal rejected by primary ledger");
            return Err(err.into());
        }

        self.positions.insert(account_id, position);
        self.total_shares = total_shares;
        self.total_positive_offsets = total_positive_offsets;
        self.pooled_primary = pooled_primary;

        debug!(%account_id, %shares_burned, %reward_credit, "withdrawal offsets recorded");
        info!(%account_id, amount = %paid, "withdrawal committed");

        let event = PrimaryWithdrawn {
            sequence: self.next_sequence(),
            account_id,
            amount: paid,
            shares_burned,
            reward_credit,
        };
        self.events.push(PoolEvent::PrimaryWithdrawn(event.clone()));
        Ok(event)
    }

    // ───────────────────────── Liquidation ─────────────────────────

    /// Pay `primary_paid` to the liquidator in exchange for `reward_received`.
    ///
    /// Lowers the redemption rate and adds reward for current shareholders.
    /// Both transfers land or neither does.
    pub fn perform_liquidation(
        &mut self,
        primary_paid: Amount,
        reward_received: Amount,
    ) -> Result<LiquidationAbsorbed, PoolError> {
        self.ensure_non_negative(primary_paid)?;
        self.ensure_non_negative(reward_received)?;

        if self.total_shares.is_zero() {
            warn!(%primary_paid, %reward_received, "liquidation against a pool without shareholders");
            return Err(PoolError::EmptyPool);
        }
        if primary_paid > self.pooled_primary {
            warn!(%primary_paid, pooled = %self.pooled_primary, "liquidation exceeds pooled primary");
            return Err(PoolError::LiquidationExceedsPool {
                required: primary_paid.to_string(),
                available: self.pooled_primary.to_string(),
            });
        }

        let pooled_primary = self.diff(self.pooled_primary, primary_paid)?;
        let reward_balance = self.sum(self.reward_balance, reward_received)?;

        let pool = self.config.pool_account;
        let liquidator = self.config.liquidator_account;

        self.reward.transfer(&liquidator, &pool, reward_received)?;
        if let Err(err) = self.primary.transfer(&pool, &liquidator, primary_paid) {
            if let Err(rollback) = self.reward.transfer(&pool, &liquidator, reward_received) {
                error!(error = %rollback, "failed to reverse reward transfer");
            }
            warn!(%primary_paid, error = %err, "liquidation rejected by primary ledger");
            return Err(err.into());
        }

        self.pooled_primary = pooled_primary;
        self.reward_balance = reward_balance;

        info!(%primary_paid, %reward_received, %pooled_primary, "liquidation absorbed");

        let event = LiquidationAbsorbed {
            sequence: self.next_sequence(),
            primary_paid,
            reward_received,
            pooled_primary_after: pooled_primary,
        };
        self.events.push(PoolEvent::LiquidationAbsorbed(event.clone()));
        Ok(event)
    }

    // ───────────────────────── Claim ─────────────────────────

    /// Pay the account its current reward entitlement.
    ///
    /// The payout is added to the account's negative offset, so an immediate
    /// second claim pays zero. A zero payout commits nothing and reports the
    /// last committed sequence.
    pub fn claim_rewards(&mut self, account_id: AccountId) -> Result<RewardsClaimed, PoolError> {
        self.ensure_holder(&account_id)?;
        let amount = self.claimable_rewards(&account_id)?;
        if amount.is_zero() {
            debug!(%account_id, "nothing to claim");
            return Ok(RewardsClaimed {
                sequence: self.sequence,
                account_id,
                amount,
            });
        }

        let mut position = self.position(&account_id);
        position.negative_offset = self.sum(position.negative_offset, amount)?;
        let total_negative_offsets = self.sum(self.total_negative_offsets, amount)?;
        let reward_balance = self.diff(self.reward_balance, amount)?;

        if let Err(err) = self
            .reward
            .transfer(&self.config.pool_account, &account_id, amount)
        {
            warn!(%account_id, %amount, error = %err, "claim rejected by reward ledger");
            return Err(err.into());
        }

        self.positions.insert(account_id, position);
        self.total_negative_offsets = total_negative_offsets;
        self.reward_balance = reward_balance;

        info!(%account_id, %amount, "rewards claimed");

        let event = RewardsClaimed {
            sequence: self.next_sequence(),
            account_id,
            amount,
        };
        self.events.push(PoolEvent::RewardsClaimed(event.clone()));
        Ok(event)
    }

    // ───────────────────────── Queries ─────────────────────────

    /// `reward_balance + total_negative_offsets - total_positive_offsets`
    pub fn virtual_collateral(&self) -> Result<Amount, PoolError> {
        let gross = self.sum(self.reward_balance, self.total_negative_offsets)?;
        self.diff(gross, self.total_positive_offsets)
    }

    /// Shares minted per unit of primary; 1 while the pool holds no primary.
    pub fn shares_per_primary(&self) -> Result<Decimal, PoolError> {
        if self.pooled_primary.is_zero() {
            return Ok(Decimal::ONE);
        }
        checked(self.total_shares.checked_div(self.pooled_primary))
    }

    /// Primary redeemed per share; 0 while no shares exist.
    pub fn primary_per_share(&self) -> Result<Decimal, PoolError> {
        if self.total_shares.is_zero() {
            return Ok(Decimal::ZERO);
        }
        checked(self.pooled_primary.checked_div(self.total_shares))
    }

    /// Primary the account could withdraw right now, rounded down.
    pub fn redeemable_balance(&self, account_id: &AccountId) -> Result<Amount, PoolError> {
        if self.total_shares.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let shares = self.shares_of(account_id);
        let redeemable = checked(mul_div_floor(
            shares,
            self.pooled_primary,
            self.total_shares,
            self.config.precision,
        ))?;
        Ok(redeemable.min(self.pooled_primary))
    }

    /// Reward a claim would pay right now.
    ///
    /// The raw entitlement is clamped to `[0, reward_balance]`; rounding dust
    /// never produces a negative payout or overdraws the pool.
    pub fn claimable_rewards(&self, account_id: &AccountId) -> Result<Amount, PoolError> {
        let entitlement = self.entitlement(account_id)?;
        if entitlement <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        Ok(entitlement.min(self.reward_balance))
    }

    fn entitlement(&self, account_id: &AccountId) -> Result<Amount, PoolError> {
        let position = self.position(account_id);
        let collateral = self.virtual_collateral()?;
        let live_share = if self.total_shares > Decimal::ZERO {
            checked(mul_div_floor(
                collateral,
                position.shares,
                self.total_shares,
                self.config.precision,
            ))?
        } else {
            collateral
        };
        let gross = self.sum(live_share, position.positive_offset)?;
        self.diff(gross, position.negative_offset)
    }

    pub fn position(&self, account_id: &AccountId) -> Position {
        self.positions.get(account_id).copied().unwrap_or_default()
    }

    pub fn shares_of(&self, account_id: &AccountId) -> Shares {
        self.position(account_id).shares
    }

    /// All accounts that have ever held a position.
    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &Position)> {
        self.positions.iter()
    }

    pub fn total_shares(&self) -> Shares {
        self.total_shares
    }

    pub fn pooled_primary(&self) -> Amount {
        self.pooled_primary
    }

    pub fn reward_balance(&self) -> Amount {
        self.reward_balance
    }

    pub fn total_negative_offsets(&self) -> Amount {
        self.total_negative_offsets
    }

    pub fn total_positive_offsets(&self) -> Amount {
        self.total_positive_offsets
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn primary_ledger(&self) -> &L {
        &self.primary
    }

    pub fn reward_ledger(&self) -> &L {
        &self.reward
    }

    // ───────────────────────── Events ─────────────────────────

    /// Get all emitted events.
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Last assigned event sequence, 0 before any operation.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// The pool account never holds a position.
    fn ensure_holder(&self, account_id: &AccountId) -> Result<(), PoolError> {
        if *account_id == self.config.pool_account {
            warn!(%account_id, "pool account cannot hold a position");
            return Err(PoolError::ReservedAccount {
                account_id: account_id.to_string(),
            });
        }
        Ok(())
    }

    fn sum(&self, a: Decimal, b: Decimal) -> Result<Decimal, PoolError> {
        checked(exact_sum(a, b, self.config.precision))
    }

    fn diff(&self, a: Decimal, b: Decimal) -> Result<Decimal, PoolError> {
        checked(exact_diff(a, b, self.config.precision))
    }

    fn ensure_positive(&self, amount: Decimal) -> Result<(), PoolError> {
        if amount <= Decimal::ZERO {
            return Err(PoolError::InvalidAmount {
                amount: amount.to_string(),
            });
        }
        self.ensure_non_negative(amount)
    }

    /// Rejects negative amounts and amounts finer than the pool's precision.
    fn ensure_non_negative(&self, amount: Decimal) -> Result<(), PoolError> {
        if amount < Decimal::ZERO || !fits_precision(amount, self.config.precision) {
            return Err(PoolError::InvalidAmount {
                amount: amount.to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_setup<L: Ledger>(
    config: &PoolConfig,
    primary: &L,
    reward: &L,
) -> Result<(), PoolError> {
    if config.precision > MAX_PRECISION {
        return Err(PoolError::Config {
            reason: format!(
                "precision {} exceeds the supported maximum of {}",
                config.precision, MAX_PRECISION
            ),
        });
    }
    if config.pool_account == config.liquidator_account {
        return Err(PoolError::Config {
            reason: "pool and liquidator accounts must differ".to_string(),
        });
    }
    if primary.asset() != config.primary_asset {
        return Err(PoolError::Config {
            reason: format!(
                "primary ledger holds {}, expected {}",
                primary.asset(),
                config.primary_asset
            ),
        });
    }
    if reward.asset() != config.reward_asset {
        return Err(PoolError::Config {
            reason: format!(
                "reward ledger holds {}, expected {}",
                reward.asset(),
                config.reward_asset
            ),
        });
    }
    Ok(())
}

fn checked(value: Option<Decimal>) -> Result<Decimal, PoolError> {
    value.ok_or(PoolError::Overflow)
}
