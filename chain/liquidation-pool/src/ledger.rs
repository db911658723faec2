//! Ledger: single-asset balance store with exact transfers
//!
//! The pool consumes two of these: one for the primary asset and one for the
//! reward asset. Balances never go negative; a transfer that would overdraw
//! its source fails without touching either side.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;
use types::ids::AccountId;
use types::numeric::{checked_diff, checked_sum};

use crate::errors::LedgerError;

/// Balance-transfer interface the pool is written against.
pub trait Ledger {
    /// Asset symbol held by this ledger.
    fn asset(&self) -> &str;

    /// Current balance, zero for unknown accounts.
    fn balance_of(&self, account_id: &AccountId) -> Decimal;

    /// Move `amount` from `from` to `to`. All-or-nothing.
    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError>;
}

/// In-memory ledger for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetLedger {
    asset: String,
    /// Balances: account -> amount
    balances: HashMap<AccountId, Decimal>,
}

impl AssetLedger {
    /// Create an empty ledger for `asset`.
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            balances: HashMap::new(),
        }
    }

    /// Create a ledger seeded with initial balances.
    pub fn with_balances(
        asset: impl Into<String>,
        balances: impl IntoIterator<Item = (AccountId, Decimal)>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(asset);
        for (account_id, amount) in balances {
            ledger.mint(account_id, amount)?;
        }
        Ok(ledger)
    }

    /// Credit new units to an account. Supply management lives outside the
    /// pool; this exists so callers can seed balances.
    pub fn mint(&mut self, account_id: AccountId, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: amount.to_string(),
            });
        }
        let current = self.balances.entry(account_id).or_insert(Decimal::ZERO);
        *current = checked_sum(*current, amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Decimal {
        self.balances.values().copied().sum()
    }
}

impl Ledger for AssetLedger {
    fn asset(&self) -> &str {
        &self.asset
    }

    fn balance_of(&self, account_id: &AccountId) -> Decimal {
        self.balances
            .get(account_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: amount.to_string(),
            });
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: self.asset.clone(),
                account_id: from.to_string(),
                required: amount.to_string(),
                available: available.to_string(),
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }

        // Compute both sides before writing either.
        let new_from = checked_diff(available, amount).ok_or(LedgerError::Overflow)?;
        let new_to = checked_sum(self.balance_of(to), amount).ok_or(LedgerError::Overflow)?;

        self.balances.insert(*from, new_from);
        self.balances.insert(*to, new_to);

        debug!(asset = %self.asset, %from, %to, %amount, "ledger transfer");
        Ok(())
    }
}
