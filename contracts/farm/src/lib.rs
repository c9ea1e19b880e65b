//! StackFarm - Multi-Pool Staking Ledger
//!
//! Participants stake a fungible asset into pools; a shared per-block
//! reward emission is split between pools by allocation weight and between
//! a pool's stakers by stake-time.
//!
//! ## Accrual Model
//!
//! Each pool keeps `acc_reward_per_share`, the scaled cumulative reward one
//! unit of stake has earned. Every operation first checkpoints the pool
//! (brings the accumulator up to the current block), then reads or updates
//! the user's position:
//!
//! ```text
//! pending = unclaimed + stake * acc / SCALE - reward_debt
//! ```
//!
//! `reward_debt` is re-based after every stake change, and reward earned
//! before the change is carried in `unclaimed`, so nothing earned is lost
//! and nothing is counted twice.
//!
//! ## Components
//!
//! - [`emission`]: per-pool accrual since the last checkpoint
//! - [`registry`]: append-only pool registry, weights, checkpoints
//! - [`engine`]: deposit / withdraw / claim / funding over external seams
//! - [`shared`]: lock-serialized handle for concurrent callers

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use stackfarm_common::{
    constants::{domain::FARM_ACCOUNT_TAG, emission as emission_defaults},
    errors::{FarmError, FarmResult},
    types::{Address, AssetId, Pool, PoolIndex, UserPosition, ZERO_ADDRESS},
    BTreeMap,
};

pub mod emission;
pub mod registry;
pub mod engine;
pub mod shared;

#[cfg(test)]
mod stress;

pub use engine::{
    ClaimResult, DepositResult, EmergencyWithdrawResult, FarmEngine, FarmStats, WithdrawResult,
};
pub use shared::SharedFarm;

// ============ Farm Config ============

/// Configuration fixed at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FarmConfig {
    /// Asset paid out as reward
    pub reward_asset: AssetId,
    /// Reward units emitted per block across all pools
    pub emission_per_block: u64,
    /// First block that emits
    pub start_block: u64,
    /// Stored only; emission is flat
    pub bonus_end_block: u64,
    /// Address allowed to run operator actions
    pub admin: Address,
}

impl FarmConfig {
    /// Config with default emission bounds
    pub fn new(reward_asset: AssetId, emission_per_block: u64, admin: Address) -> Self {
        Self {
            reward_asset,
            emission_per_block,
            start_block: emission_defaults::DEFAULT_START_BLOCK,
            bonus_end_block: emission_defaults::DEFAULT_BONUS_END_BLOCK,
            admin,
        }
    }

    /// Set the emission bounds
    pub fn with_blocks(mut self, start_block: u64, bonus_end_block: u64) -> Self {
        self.start_block = start_block;
        self.bonus_end_block = bonus_end_block;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// - `InvalidAddress` for a zero admin or reward asset
    /// - `InvalidConfig` if `bonus_end_block < start_block`
    pub fn validate(&self) -> FarmResult<()> {
        if self.admin == ZERO_ADDRESS {
            return Err(FarmError::InvalidAddress {
                reason: "admin cannot be zero address",
            });
        }
        if self.reward_asset == ZERO_ADDRESS {
            return Err(FarmError::InvalidAddress {
                reason: "reward asset cannot be zero",
            });
        }
        if self.bonus_end_block < self.start_block {
            return Err(FarmError::InvalidConfig {
                param: "bonus_end_block",
                reason: "must not precede start_block",
            });
        }
        Ok(())
    }

    /// Address the farm holds stake and reward under
    pub fn custody_address(&self) -> Address {
        farm_account_address(&self.reward_asset, &self.admin)
    }
}

/// Derive the deterministic custody address of a farm
pub fn farm_account_address(reward_asset: &AssetId, admin: &Address) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(FARM_ACCOUNT_TAG);
    hasher.update(reward_asset);
    hasher.update(admin);
    let result = hasher.finalize();
    let mut address = [0u8; 32];
    address.copy_from_slice(&result);
    address
}

// ============ Farm State ============

/// Global ledger state, exclusively owned by one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FarmState {
    /// Initialization parameters
    pub config: FarmConfig,
    /// Reward units funded and not yet claimed
    pub reward_budget: u64,
    /// Sum of every pool's weight
    pub total_allocation_weight: u64,
    /// Append-only pool registry
    pub pools: Vec<Pool>,
    /// (pool, user) -> position
    pub positions: BTreeMap<(PoolIndex, Address), UserPosition>,
    /// Lifetime reward paid out
    pub total_rewards_paid: u64,
    /// Lifetime reward funded
    pub total_rewards_funded: u64,
}

impl FarmState {
    /// Empty state for a validated config
    pub fn new(config: FarmConfig) -> FarmResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            reward_budget: 0,
            total_allocation_weight: 0,
            pools: Vec::new(),
            positions: BTreeMap::new(),
            total_rewards_paid: 0,
            total_rewards_funded: 0,
        })
    }

    /// Serialize the full state for storage
    pub fn to_bytes(&self) -> FarmResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| FarmError::SnapshotFailed {
            reason: "state could not be serialized",
        })
    }

    /// Restore a state written by [`FarmState::to_bytes`]
    ///
    /// The bytes must decode and the decoded state must pass
    /// [`FarmState::validate`].
    pub fn from_bytes(bytes: &[u8]) -> FarmResult<Self> {
        let state: Self = borsh::from_slice(bytes).map_err(|_| FarmError::SnapshotFailed {
            reason: "malformed state bytes",
        })?;
        state.config.validate()?;
        state.validate()?;
        Ok(state)
    }

    /// Check the ledger invariants of a state
    ///
    /// - `total_allocation_weight` equals the sum of pool weights
    /// - every position refers to a registered pool
    /// - each pool's `total_staked` and `staker_count` match its positions
    pub fn validate(&self) -> FarmResult<()> {
        if self.total_allocation_weight as u128 != self.summed_weights() {
            return Err(FarmError::SnapshotFailed {
                reason: "total allocation weight does not match pool weights",
            });
        }

        let mut stakes = vec![0u128; self.pools.len()];
        let mut stakers = vec![0u64; self.pools.len()];
        for ((pool_index, _), position) in &self.positions {
            let slot = *pool_index as usize;
            if slot >= self.pools.len() {
                return Err(FarmError::SnapshotFailed {
                    reason: "position refers to an unknown pool",
                });
            }
            stakes[slot] += position.staked_amount as u128;
            if position.is_staked() {
                stakers[slot] += 1;
            }
        }

        for (index, pool) in self.pools.iter().enumerate() {
            if pool.total_staked as u128 != stakes[index] {
                return Err(FarmError::SnapshotFailed {
                    reason: "pool total does not match position stakes",
                });
            }
            if pool.staker_count != stakers[index] {
                return Err(FarmError::SnapshotFailed {
                    reason: "pool staker count does not match positions",
                });
            }
        }
        Ok(())
    }

    /// Position of `user` in `pool_index`, if one was ever opened
    pub fn position(&self, pool_index: PoolIndex, user: &Address) -> Option<&UserPosition> {
        self.positions.get(&(pool_index, *user))
    }

    /// Positions that currently hold stake
    pub fn active_positions(&self) -> usize {
        self.positions.values().filter(|p| p.is_staked()).count()
    }
}
