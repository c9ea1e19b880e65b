//! Pool Registry
//!
//! Ordered, append-only collection of pools. Pools are never removed;
//! their weights may change, and `total_allocation_weight` always equals
//! the sum of all weights.
//!
//! All methods take the current height explicitly and leave the state
//! untouched when they fail.

use stackfarm_common::{
    constants::limits::MAX_POOLS,
    errors::{FarmError, FarmResult},
    math::{safe_add, safe_sub},
    types::{AssetId, Pool, PoolIndex, ZERO_ADDRESS},
};

use crate::emission::{accrue, Accrual};
use crate::FarmState;

/// Checkpoint outcome for one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointReport {
    pub pool_index: PoolIndex,
    pub pool_reward: u64,
    pub acc_reward_per_share: u128,
}

impl FarmState {
    /// Number of registered pools
    pub fn pool_count(&self) -> u32 {
        self.pools.len() as u32
    }

    /// Pool at `pool_index`
    ///
    /// # Errors
    /// `InvalidIndex` if no such pool exists
    pub fn pool(&self, pool_index: PoolIndex) -> FarmResult<&Pool> {
        self.pools
            .get(pool_index as usize)
            .ok_or(FarmError::InvalidIndex {
                pool_index,
                pool_count: self.pool_count(),
            })
    }

    /// Accrual of `pool_index` at `now`, without applying it
    pub fn accrual(&self, pool_index: PoolIndex, now: u64) -> FarmResult<Accrual> {
        let pool = self.pool(pool_index)?;
        accrue(pool, &self.config, self.total_allocation_weight, now)
    }

    /// Bring one pool's accumulator up to `now`
    pub fn checkpoint(&mut self, pool_index: PoolIndex, now: u64) -> FarmResult<CheckpointReport> {
        let accrual = self.accrual(pool_index, now)?;
        let pool = &mut self.pools[pool_index as usize];
        accrual.apply(pool);

        if accrual.pool_reward > 0 {
            log::debug!(
                "checkpoint pool={} blocks={} reward={} acc={}",
                pool_index, accrual.blocks, accrual.pool_reward, accrual.acc_reward_per_share
            );
        }

        Ok(CheckpointReport {
            pool_index,
            pool_reward: accrual.pool_reward,
            acc_reward_per_share: accrual.acc_reward_per_share,
        })
    }

    /// Bring every pool's accumulator up to `now`, in index order
    ///
    /// All accruals are computed before any is applied, so a failure on
    /// one pool leaves every pool untouched.
    pub fn checkpoint_all(&mut self, now: u64) -> FarmResult<Vec<CheckpointReport>> {
        let accruals = (0..self.pool_count())
            .map(|index| self.accrual(index, now))
            .collect::<FarmResult<Vec<_>>>()?;

        let mut reports = Vec::with_capacity(accruals.len());
        for (index, accrual) in accruals.into_iter().enumerate() {
            accrual.apply(&mut self.pools[index]);
            reports.push(CheckpointReport {
                pool_index: index as PoolIndex,
                pool_reward: accrual.pool_reward,
                acc_reward_per_share: accrual.acc_reward_per_share,
            });
        }
        Ok(reports)
    }

    /// Append a pool and add its weight to the total
    ///
    /// With `also_checkpoint_all`, existing pools are checkpointed first so
    /// the new weight split does not reach back into past blocks.
    pub fn register_pool(
        &mut self,
        stake_asset: AssetId,
        weight: u64,
        also_checkpoint_all: bool,
        now: u64,
    ) -> FarmResult<(PoolIndex, Vec<CheckpointReport>)> {
        if stake_asset == ZERO_ADDRESS {
            return Err(FarmError::InvalidAddress {
                reason: "stake asset cannot be zero",
            });
        }
        if self.pools.len() >= MAX_POOLS {
            return Err(FarmError::InvalidConfig {
                param: "pools",
                reason: "registry is full",
            });
        }
        let new_total = safe_add(self.total_allocation_weight, weight)?;

        let reports = if also_checkpoint_all {
            self.checkpoint_all(now)?
        } else {
            Vec::new()
        };

        let pool_index = self.pool_count();
        self.pools.push(Pool::new(stake_asset, weight, now));
        self.total_allocation_weight = new_total;

        Ok((pool_index, reports))
    }

    /// Change a pool's weight, adjusting the total by the difference
    ///
    /// Returns the previous weight.
    pub fn set_pool_weight(
        &mut self,
        pool_index: PoolIndex,
        weight: u64,
        also_checkpoint_all: bool,
        now: u64,
    ) -> FarmResult<(u64, Vec<CheckpointReport>)> {
        let old_weight = self.pool(pool_index)?.weight;
        let new_total = safe_add(safe_sub(self.total_allocation_weight, old_weight)?, weight)?;

        let reports = if also_checkpoint_all {
            self.checkpoint_all(now)?
        } else {
            Vec::new()
        };

        self.pools[pool_index as usize].weight = weight;
        self.total_allocation_weight = new_total;

        Ok((old_weight, reports))
    }

    /// Sum of all pool weights, recomputed from the registry
    pub fn summed_weights(&self) -> u128 {
        self.pools.iter().map(|p| p.weight as u128).sum()
    }
}
