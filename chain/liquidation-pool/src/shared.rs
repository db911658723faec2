//! Thread-safe pool handle
//!
//! The offset scheme needs every operation to see one consistent snapshot of
//! `total_shares` and the virtual collateral, so the whole pool, ledgers
//! included, sits behind a single mutex and each call holds it end to end.

use std::sync::{Arc, Mutex, MutexGuard};
use types::ids::AccountId;
use types::numeric::Amount;

use crate::errors::PoolError;
use crate::events::{Deposited, LiquidationAbsorbed, PrimaryWithdrawn, RewardsClaimed};
use crate::ledger::{AssetLedger, Ledger};
use crate::pool::LiquidationPool;

/// Cloneable handle to a pool shared between threads.
#[derive(Debug)]
pub struct SharedPool<L: Ledger = AssetLedger> {
    inner: Arc<Mutex<LiquidationPool<L>>>,
}

impl<L: Ledger> Clone for SharedPool<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Ledger> SharedPool<L> {
    pub fn new(pool: LiquidationPool<L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    pub fn deposit(&self, account_id: AccountId, amount: Amount) -> Result<Deposited, PoolError> {
        self.lock()?.deposit(account_id, amount)
    }

    pub fn withdraw_primary(
        &self,
        account_id: AccountId,
        amount: Amount,
    ) -> Result<PrimaryWithdrawn, PoolError> {
        self.lock()?.withdraw_primary(account_id, amount)
    }

    pub fn perform_liquidation(
        &self,
        primary_paid: Amount,
        reward_received: Amount,
    ) -> Result<LiquidationAbsorbed, PoolError> {
        self.lock()?.perform_liquidation(primary_paid, reward_received)
    }

    pub fn claim_rewards(&self, account_id: AccountId) -> Result<RewardsClaimed, PoolError> {
        self.lock()?.claim_rewards(account_id)
    }

    /// Run a read-only closure against a consistent view of the pool.
    pub fn with_pool<T>(&self, f: impl FnOnce(&LiquidationPool<L>) -> T) -> Result<T, PoolError> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    fn lock(&self) -> Result<MutexGuard<'_, LiquidationPool<L>>, PoolError> {
        self.inner.lock().map_err(|_| PoolError::LockPoisoned)
    }
}
