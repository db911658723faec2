//! Pool Lifecycle Tests
//!
//! End-to-end runs of the pool against in-memory ledgers:
//! - Reference scenario (two depositors, liquidation, late depositor)
//! - Reward isolation between deposit generations
//! - Ledger supply conservation
//! - Snapshot round trip of a live pool
//! - Shared pool across threads

use liquidation_pool::{
    AssetLedger, Ledger, LiquidationPool, PoolConfig, PoolError, PoolSnapshot, SharedPool,
};
use rust_decimal::Decimal;
use std::thread;
use types::ids::AccountId;
use types::numeric::approx_eq;

const POOL: u128 = 100;
const LIQUIDATOR: u128 = 200;

// ═══════════════════════════════════════════════════════════════════
// Reference Scenario
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_reference_scenario() {
    init_tracing();
    let mut pool = setup_pool();

    pool.deposit(acc(1), Decimal::from(2)).unwrap();
    pool.deposit(acc(2), Decimal::from(4)).unwrap();
    assert_eq!(pool.total_shares(), Decimal::from(6));
    assert_eq!(pool.pooled_primary(), Decimal::from(6));

    pool.perform_liquidation(Decimal::from(3), Decimal::ONE).unwrap();
    assert_eq!(pool.pooled_primary(), Decimal::from(3));
    assert_eq!(pool.reward_balance(), Decimal::ONE);
    assert_eq!(pool.virtual_collateral().unwrap(), Decimal::ONE);

    // 5 primary at 6 shares per 3 primary
    let late = pool.deposit(acc(3), Decimal::from(5)).unwrap();
    assert_eq!(late.shares_minted, Decimal::from(10));
    assert!(approx_eq(late.reward_offset, third() * Decimal::from(5), tolerance()));
    assert_eq!(pool.total_shares(), Decimal::from(16));
    assert_eq!(pool.pooled_primary(), Decimal::from(8));

    // The late depositor did not hold shares during the liquidation
    let claimed = pool.claim_rewards(acc(3)).unwrap();
    assert!(approx_eq(claimed.amount, Decimal::ZERO, tolerance()));
    assert_eq!(pool.reward_ledger().balance_of(&acc(3)), Decimal::from(10));

    let claimed = pool.claim_rewards(acc(1)).unwrap();
    assert!(approx_eq(claimed.amount, third(), tolerance()));
    assert!(approx_eq(
        pool.reward_ledger().balance_of(&acc(1)),
        Decimal::from(10) + third(),
        tolerance()
    ));
    assert!(approx_eq(pool.reward_balance(), third() * Decimal::from(2), tolerance()));
    assert!(approx_eq(
        pool.claimable_rewards(&acc(2)).unwrap(),
        third() * Decimal::from(2),
        tolerance()
    ));

    assert_eq!(pool.redeemable_balance(&acc(1)).unwrap(), Decimal::ONE);
    assert_eq!(pool.redeemable_balance(&acc(2)).unwrap(), Decimal::from(2));
    assert_eq!(pool.redeemable_balance(&acc(3)).unwrap(), Decimal::from(5));
}

#[test]
fn test_reference_scenario_rounds_in_pool_favour() {
    let mut pool = setup_pool();
    pool.deposit(acc(1), Decimal::from(2)).unwrap();
    pool.deposit(acc(2), Decimal::from(4)).unwrap();
    pool.perform_liquidation(Decimal::from(3), Decimal::ONE).unwrap();
    pool.deposit(acc(3), Decimal::from(5)).unwrap();

    let total: Decimal = (1..=3)
        .map(|n| pool.claimable_rewards(&acc(n)).unwrap())
        .sum();
    assert!(total <= pool.reward_balance());
    assert!(approx_eq(total, pool.reward_balance(), tolerance()));
}

// ═══════════════════════════════════════════════════════════════════
// Reward Isolation
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_each_liquidation_pays_the_holders_of_its_time() {
    let mut pool = setup_pool();
    pool.deposit(acc(1), Decimal::from(5)).unwrap();
    pool.perform_liquidation(Decimal::ONE, Decimal::from(2)).unwrap();

    // Same pool value per share for the newcomer, no share of the first reward
    pool.deposit(acc(2), Decimal::from(4)).unwrap();
    assert_eq!(pool.shares_of(&acc(2)), Decimal::from(5));
    pool.perform_liquidation(Decimal::from(2), Decimal::from(4)).unwrap();

    assert_eq!(pool.claimable_rewards(&acc(1)).unwrap(), Decimal::from(4));
    assert_eq!(pool.claimable_rewards(&acc(2)).unwrap(), Decimal::from(2));
}

#[test]
fn test_exited_holder_keeps_reward_and_misses_later_ones() {
    let mut pool = setup_pool();
    pool.deposit(acc(1), Decimal::from(5)).unwrap();
    pool.deposit(acc(2), Decimal::from(5)).unwrap();
    pool.perform_liquidation(Decimal::from(2), Decimal::from(2)).unwrap();

    let redeemable = pool.redeemable_balance(&acc(1)).unwrap();
    assert_eq!(redeemable, Decimal::from(4));
    pool.withdraw_primary(acc(1), redeemable).unwrap();
    assert_eq!(pool.shares_of(&acc(1)), Decimal::ZERO);

    pool.perform_liquidation(Decimal::ONE, Decimal::from(3)).unwrap();

    assert_eq!(pool.claimable_rewards(&acc(1)).unwrap(), Decimal::ONE);
    assert_eq!(pool.claimable_rewards(&acc(2)).unwrap(), Decimal::from(4));
}

#[test]
fn test_withdraw_beyond_redeemable_is_rejected_without_side_effects() {
    let mut pool = setup_pool();
    pool.deposit(acc(1), Decimal::from(5)).unwrap();
    pool.perform_liquidation(Decimal::from(2), Decimal::ONE).unwrap();
    let before = pool.snapshot().unwrap();

    let result = pool.withdraw_primary(acc(1), Decimal::from(5));
    assert!(matches!(result, Err(PoolError::InsufficientShareBalance { .. })));

    let after = pool.snapshot().unwrap();
    assert_eq!(before.checksum, after.checksum);
    assert_eq!(pool.primary_ledger().balance_of(&acc(1)), Decimal::from(5));
}

#[test]
fn test_depositor_gets_back_exactly_what_they_put_in() {
    let mut pool = setup_pool();
    pool.deposit(acc(1), Decimal::from(7)).unwrap();
    pool.perform_liquidation(Decimal::from(4), Decimal::ONE).unwrap();

    // 7 shares over 3 primary; the redeemable balance rounds one unit short
    pool.deposit(acc(2), Decimal::ONE).unwrap();
    assert!(pool.redeemable_balance(&acc(2)).unwrap() < Decimal::ONE);
    pool.withdraw_primary(acc(2), Decimal::ONE).unwrap();

    assert_eq!(pool.primary_ledger().balance_of(&acc(2)), Decimal::from(10));
    assert_eq!(pool.shares_of(&acc(2)), Decimal::ZERO);
    assert_eq!(
        pool.primary_ledger().balance_of(&acc(POOL)),
        pool.pooled_primary()
    );

    let restored = LiquidationPool::restore(
        pool.config().clone(),
        pool.primary_ledger().clone(),
        pool.reward_ledger().clone(),
        &pool.snapshot().unwrap(),
    )
    .unwrap();
    assert_eq!(restored.total_shares(), Decimal::from(7));
    assert_eq!(restored.claimable_rewards(&acc(1)).unwrap(), Decimal::ONE);
}

#[test]
fn test_pool_account_is_refused_as_a_depositor() {
    let mut pool = setup_pool();
    pool.deposit(acc(1), Decimal::from(5)).unwrap();

    let result = pool.deposit(acc(POOL), Decimal::from(5));
    assert!(matches!(result, Err(PoolError::ReservedAccount { .. })));
    assert_eq!(pool.pooled_primary(), Decimal::from(5));
    assert_eq!(
        pool.primary_ledger().balance_of(&acc(POOL)),
        pool.pooled_primary()
    );
}

// ═══════════════════════════════════════════════════════════════════
// Ledger Conservation
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_full_cycle_conserves_ledger_supply() {
    let mut pool = setup_pool();
    let primary_supply = pool.primary_ledger().total_supply();
    let reward_supply = pool.reward_ledger().total_supply();

    for n in 1..=3 {
        pool.deposit(acc(n), Decimal::from(n as i64 * 2)).unwrap();
    }
    pool.perform_liquidation(Decimal::from(4), Decimal::from(3)).unwrap();
    pool.deposit(acc(1), Decimal::ONE).unwrap();
    pool.perform_liquidation(Decimal::ONE, Decimal::from(2)).unwrap();

    for n in 1..=3 {
        let redeemable = pool.redeemable_balance(&acc(n)).unwrap();
        pool.withdraw_primary(acc(n), redeemable).unwrap();
        pool.claim_rewards(acc(n)).unwrap();
    }

    assert_eq!(pool.total_shares(), Decimal::ZERO);
    assert_eq!(pool.primary_ledger().total_supply(), primary_supply);
    assert_eq!(pool.reward_ledger().total_supply(), reward_supply);
    assert_eq!(
        pool.primary_ledger().balance_of(&acc(POOL)),
        pool.pooled_primary()
    );
    assert_eq!(
        pool.reward_ledger().balance_of(&acc(POOL)),
        pool.reward_balance()
    );
    assert!(pool.reward_balance() < tolerance());
    assert!(pool.pooled_primary() < tolerance());
}

// ═══════════════════════════════════════════════════════════════════
// Snapshot Round Trip
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_restored_pool_matches_original_going_forward() {
    let mut original = setup_pool();
    original.deposit(acc(1), Decimal::from(2)).unwrap();
    original.deposit(acc(2), Decimal::from(4)).unwrap();
    original.perform_liquidation(Decimal::from(3), Decimal::ONE).unwrap();
    original.deposit(acc(3), Decimal::from(5)).unwrap();

    let json = original.snapshot().unwrap().to_json().unwrap();
    let snapshot = PoolSnapshot::from_json(&json).unwrap();
    let mut restored = LiquidationPool::restore(
        original.config().clone(),
        original.primary_ledger().clone(),
        original.reward_ledger().clone(),
        &snapshot,
    )
    .unwrap();

    for pool in [&mut original, &mut restored] {
        pool.perform_liquidation(Decimal::from(2), Decimal::from(4)).unwrap();
        pool.claim_rewards(acc(2)).unwrap();
    }

    for n in 1..=3 {
        assert_eq!(
            original.claimable_rewards(&acc(n)).unwrap(),
            restored.claimable_rewards(&acc(n)).unwrap()
        );
        assert_eq!(
            original.redeemable_balance(&acc(n)).unwrap(),
            restored.redeemable_balance(&acc(n)).unwrap()
        );
    }
    assert_eq!(original.sequence(), restored.sequence());
    assert_eq!(
        original.snapshot().unwrap().checksum,
        restored.snapshot().unwrap().checksum
    );
}

// ═══════════════════════════════════════════════════════════════════
// Shared Pool
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_shared_pool_interleaved_operations_stay_consistent() {
    init_tracing();
    let pool = SharedPool::new(setup_pool());
    for n in 1..=3 {
        pool.deposit(acc(n), Decimal::from(3)).unwrap();
    }

    let liquidator = {
        let pool = pool.clone();
        thread::spawn(move || {
            for _ in 0..3 {
                pool.perform_liquidation(Decimal::ONE, Decimal::from(3)).unwrap();
            }
        })
    };
    let claimers: Vec<_> = (1..=3)
        .map(|n| {
            let pool = pool.clone();
            thread::spawn(move || {
                let mut paid = Decimal::ZERO;
                for _ in 0..3 {
                    paid += pool.claim_rewards(acc(n)).unwrap().amount;
                }
                paid
            })
        })
        .collect();

    liquidator.join().unwrap();
    let mut paid: Decimal = claimers.into_iter().map(|h| h.join().unwrap()).sum();
    for n in 1..=3 {
        paid += pool.claim_rewards(acc(n)).unwrap().amount;
    }

    // Equal holders, 9 reward in total
    assert_eq!(paid, Decimal::from(9));
    pool.with_pool(|p| {
        assert_eq!(p.reward_balance(), Decimal::ZERO);
        assert_eq!(p.pooled_primary(), Decimal::from(6));
        assert_eq!(p.reward_ledger().balance_of(&acc(POOL)), Decimal::ZERO);
        for n in 1..=3 {
            assert_eq!(p.reward_ledger().balance_of(&acc(n)), Decimal::from(13));
        }
    })
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn acc(n: u128) -> AccountId {
    AccountId::from_u128(n)
}

fn tolerance() -> Decimal {
    Decimal::new(1, 12)
}

fn third() -> Decimal {
    Decimal::ONE / Decimal::from(3)
}

/// Accounts 1..=3 start with 10 of each asset, the liquidator with 1000.
fn setup_pool() -> LiquidationPool {
    let ledger = |asset: &str| {
        let mut balances: Vec<(AccountId, Decimal)> =
            (1..=3).map(|n| (acc(n), Decimal::from(10))).collect();
        balances.push((acc(LIQUIDATOR), Decimal::from(1000)));
        AssetLedger::with_balances(asset, balances).unwrap()
    };
    let config = PoolConfig::new(acc(POOL), acc(LIQUIDATOR));
    LiquidationPool::new(config, ledger("PRIMARY"), ledger("REWARD")).unwrap()
}
