//! Reward Emission Clock
//!
//! Computes how much of the global per-block emission a pool earned since
//! its last checkpoint and what its accumulator becomes. The same
//! computation backs both the mutating checkpoint and the read-only
//! pending-reward projection, so the two can never disagree.

use stackfarm_common::{
    errors::{FarmError, FarmResult},
    math::{emission_window, pool_emission, reward_per_share},
    types::Pool,
};

use crate::FarmConfig;

/// Outcome of bringing a pool current at some height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    /// Emitting blocks covered
    pub blocks: u64,
    /// Reward units attributed to the pool's stakers
    pub pool_reward: u64,
    /// Accumulator after the accrual
    pub acc_reward_per_share: u128,
    /// Height the pool is checkpointed at
    pub checkpoint_block: u64,
}

impl Accrual {
    /// Write the accrual into `pool`
    pub fn apply(&self, pool: &mut Pool) {
        pool.acc_reward_per_share = self.acc_reward_per_share;
        pool.last_checkpoint_block = self.checkpoint_block;
    }

    /// Returns true if nothing changes
    pub fn is_noop(&self, pool: &Pool) -> bool {
        self.checkpoint_block == pool.last_checkpoint_block
            && self.acc_reward_per_share == pool.acc_reward_per_share
    }
}

/// Compute the accrual of `pool` at height `now`
///
/// - same height: nothing changes
/// - empty pool: the checkpoint advances, the emission is dropped
/// - otherwise: `acc += scale_up(pool_reward) / total_staked`
pub fn accrue(
    pool: &Pool,
    config: &FarmConfig,
    total_allocation_weight: u64,
    now: u64,
) -> FarmResult<Accrual> {
    if now < pool.last_checkpoint_block {
        return Err(FarmError::ClockRegression {
            last: pool.last_checkpoint_block,
            current: now,
        });
    }

    let unchanged = Accrual {
        blocks: 0,
        pool_reward: 0,
        acc_reward_per_share: pool.acc_reward_per_share,
        checkpoint_block: now,
    };

    if now == pool.last_checkpoint_block || pool.total_staked == 0 {
        return Ok(unchanged);
    }

    let blocks = emission_window(pool.last_checkpoint_block, now, config.start_block);
    let pool_reward = pool_emission(
        blocks,
        config.emission_per_block,
        pool.weight,
        total_allocation_weight,
    )?;

    let increment = reward_per_share(pool_reward, pool.total_staked)?;
    let acc_reward_per_share = pool
        .acc_reward_per_share
        .checked_add(increment)
        .ok_or(FarmError::Overflow)?;

    Ok(Accrual {
        blocks,
        pool_reward,
        acc_reward_per_share,
        checkpoint_block: now,
    })
}

/// Accumulator a checkpoint at `now` would produce, without mutating `pool`
pub fn project_accumulator(
    pool: &Pool,
    config: &FarmConfig,
    total_allocation_weight: u64,
    now: u64,
) -> FarmResult<u128> {
    accrue(pool, config, total_allocation_weight, now).map(|a| a.acc_reward_per_share)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackfarm_common::constants::precision::SCALE;

    fn config(emission: u64, start_block: u64) -> FarmConfig {
        FarmConfig {
            reward_asset: [7u8; 32],
            emission_per_block: emission,
            start_block,
            bonus_end_block: start_block + 100,
            admin: [1u8; 32],
        }
    }

    fn staked_pool(total_staked: u64, weight: u64, last: u64) -> Pool {
        let mut pool = Pool::new([8u8; 32], weight, last);
        pool.total_staked = total_staked;
        pool
    }

    #[test]
    fn test_accrue_single_pool() {
        let pool = staked_pool(1000, 3, 10);
        let accrual = accrue(&pool, &config(3, 0), 3, 20).unwrap();

        assert_eq!(accrual.blocks, 10);
        assert_eq!(accrual.pool_reward, 30);
        assert_eq!(accrual.acc_reward_per_share, 30 * SCALE / 1000);
        assert_eq!(accrual.checkpoint_block, 20);
    }

    #[test]
    fn test_accrue_same_height_is_noop() {
        let pool = staked_pool(1000, 3, 10);
        let accrual = accrue(&pool, &config(3, 0), 3, 10).unwrap();
        assert!(accrual.is_noop(&pool));
        assert_eq!(accrual.pool_reward, 0);
    }

    #[test]
    fn test_accrue_empty_pool_drops_emission() {
        let pool = staked_pool(0, 3, 10);
        let accrual = accrue(&pool, &config(3, 0), 3, 50).unwrap();

        assert_eq!(accrual.pool_reward, 0);
        assert_eq!(accrual.acc_reward_per_share, 0);
        assert_eq!(accrual.checkpoint_block, 50);
        assert!(!accrual.is_noop(&pool));
    }

    #[test]
    fn test_accrue_weight_share() {
        // Pool holds 1 of 4 weight: 8 blocks * 40 * 1/4 = 80
        let pool = staked_pool(400, 1, 0);
        let accrual = accrue(&pool, &config(40, 0), 4, 8).unwrap();
        assert_eq!(accrual.pool_reward, 80);
        assert_eq!(accrual.acc_reward_per_share, 80 * SCALE / 400);
    }

    #[test]
    fn test_accrue_before_start_block() {
        let pool = staked_pool(1000, 1, 0);
        let cfg = config(10, 50);

        let before = accrue(&pool, &cfg, 1, 40).unwrap();
        assert_eq!(before.pool_reward, 0);
        assert_eq!(before.checkpoint_block, 40);

        // Only blocks 50..60 emit
        let after = accrue(&pool, &cfg, 1, 60).unwrap();
        assert_eq!(after.blocks, 10);
        assert_eq!(after.pool_reward, 100);
    }

    #[test]
    fn test_accrue_clock_regression() {
        let pool = staked_pool(1000, 1, 10);
        let result = accrue(&pool, &config(3, 0), 1, 9);
        assert!(matches!(result, Err(FarmError::ClockRegression { last: 10, current: 9 })));
    }

    #[test]
    fn test_projection_does_not_mutate() {
        let pool = staked_pool(1000, 3, 10);
        let before = pool.clone();
        let acc = project_accumulator(&pool, &config(3, 0), 3, 20).unwrap();

        assert_eq!(acc, 30 * SCALE / 1000);
        assert_eq!(pool, before);
    }

    #[test]
    fn test_apply_writes_pool() {
        let mut pool = staked_pool(1000, 3, 10);
        let accrual = accrue(&pool, &config(3, 0), 3, 12).unwrap();
        accrual.apply(&mut pool);

        assert_eq!(pool.last_checkpoint_block, 12);
        assert_eq!(pool.acc_reward_per_share, 6 * SCALE / 1000);
    }
}
