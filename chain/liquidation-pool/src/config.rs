//! Pool configuration

use serde::{Deserialize, Serialize};
use types::ids::AccountId;
use types::numeric::DEFAULT_PRECISION;

/// Default symbol of the pooled, redeemable asset.
pub const DEFAULT_PRIMARY_ASSET: &str = "PRIMARY";

/// Default symbol of the distributed reward asset.
pub const DEFAULT_REWARD_ASSET: &str = "REWARD";

/// Static pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Account that holds pooled primary and undistributed reward on both ledgers
    pub pool_account: AccountId,
    /// Counterparty of liquidation events
    pub liquidator_account: AccountId,
    /// Asset symbol expected on the primary ledger
    pub primary_asset: String,
    /// Asset symbol expected on the reward ledger
    pub reward_asset: String,
    /// Decimal places kept for amounts, shares and offsets
    #[serde(default = "default_precision")]
    pub precision: u32,
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

impl PoolConfig {
    pub fn new(pool_account: AccountId, liquidator_account: AccountId) -> Self {
        Self {
            pool_account,
            liquidator_account,
            primary_asset: DEFAULT_PRIMARY_ASSET.to_string(),
            reward_asset: DEFAULT_REWARD_ASSET.to_string(),
            precision: DEFAULT_PRECISION,
        }
    }

    /// Override the asset symbols.
    pub fn with_assets(mut self, primary: impl Into<String>, reward: impl Into<String>) -> Self {
        self.primary_asset = primary.into();
        self.reward_asset = reward.into();
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(AccountId::new(), AccountId::new())
    }
}
