//! Core Types for the StackFarm ledger
//!
//! Pools, user positions and the actions the engine accepts.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{FarmError, FarmResult};
use crate::math::{reward_owed, safe_add, to_units};

/// Type alias for account addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for fungible asset identifiers
pub type AssetId = [u8; 32];

/// Index of a pool in the append-only registry
pub type PoolIndex = u32;

/// The all-zero address, never a valid owner or admin
pub const ZERO_ADDRESS: Address = [0u8; 32];

// ============ Pool Types ============

/// A stake/reward accounting bucket with its own weight and accumulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Pool {
    /// Asset accepted as stake
    pub stake_asset: AssetId,
    /// Allocation weight (share of the global emission)
    pub weight: u64,
    /// Last block at which the accumulator was brought current
    pub last_checkpoint_block: u64,
    /// Cumulative reward per unit of stake, scaled by `SCALE`
    pub acc_reward_per_share: u128,
    /// Sum of all positions' staked amounts
    pub total_staked: u64,
    /// Number of positions with a non-zero stake
    pub staker_count: u64,
}

impl Pool {
    /// Creates an empty pool checkpointed at `block`
    pub fn new(stake_asset: AssetId, weight: u64, block: u64) -> Self {
        Self {
            stake_asset,
            weight,
            last_checkpoint_block: block,
            acc_reward_per_share: 0,
            total_staked: 0,
            staker_count: 0,
        }
    }

    /// Read-only view exposed through the query surface
    pub fn info(&self) -> PoolInfo {
        PoolInfo {
            stake_asset: self.stake_asset,
            weight: self.weight,
            acc_reward_per_share: self.acc_reward_per_share,
            total_staked: self.total_staked,
            last_checkpoint_block: self.last_checkpoint_block,
        }
    }
}

/// Pool snapshot returned by `pool_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolInfo {
    pub stake_asset: AssetId,
    pub weight: u64,
    pub acc_reward_per_share: u128,
    pub total_staked: u64,
    pub last_checkpoint_block: u64,
}

// ============ Position Types ============

/// A user's stake in one pool
///
/// After every operation touching the position,
/// `reward_debt == staked_amount * acc / SCALE` for the pool's current
/// accumulator. Reward earned before a stake change is carried in
/// `unclaimed` until it is paid out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UserPosition {
    /// Units currently staked
    pub staked_amount: u64,
    /// Reward units already accounted for at the current stake
    ///
    /// Measured against the pool's whole accumulator history, so it can
    /// exceed any amount ever paid out.
    pub reward_debt: u128,
    /// Settled reward not yet paid out
    pub unclaimed: u64,
    /// Lifetime reward paid to this position
    pub total_claimed: u64,
    /// Block of the last operation on this position
    pub last_updated_block: u64,
}

impl UserPosition {
    /// Creates an empty position (zero stake, zero debt)
    pub fn new(block: u64) -> Self {
        Self {
            last_updated_block: block,
            ..Self::default()
        }
    }

    /// Returns true if the position holds stake
    pub fn is_staked(&self) -> bool {
        self.staked_amount > 0
    }

    /// Reward accrued since the last settlement at accumulator `acc`
    pub fn accrued(&self, acc_reward_per_share: u128) -> FarmResult<u64> {
        let gross = reward_owed(self.staked_amount, acc_reward_per_share)?;
        // acc never decreases, so gross >= debt for a consistent position
        let accrued = gross
            .checked_sub(self.reward_debt)
            .ok_or(FarmError::Underflow)?;
        to_units(accrued)
    }

    /// Total claimable reward at accumulator `acc`
    pub fn pending(&self, acc_reward_per_share: u128) -> FarmResult<u64> {
        safe_add(self.unclaimed, self.accrued(acc_reward_per_share)?)
    }

    /// Pending reward for reporting only; never fails
    ///
    /// An inconsistent debt counts as nothing accrued, and the sum
    /// saturates at `u64::MAX`.
    pub fn pending_saturating(&self, acc_reward_per_share: u128) -> u64 {
        let accrued = reward_owed(self.staked_amount, acc_reward_per_share)
            .map(|gross| gross.saturating_sub(self.reward_debt))
            .unwrap_or(0);
        let accrued = u64::try_from(accrued).unwrap_or(u64::MAX);
        self.unclaimed.saturating_add(accrued)
    }

    /// Move accrued reward into `unclaimed` and re-base the debt
    ///
    /// Returns the amount newly settled.
    pub fn settle(&mut self, acc_reward_per_share: u128) -> FarmResult<u64> {
        let accrued = self.accrued(acc_reward_per_share)?;
        self.unclaimed = safe_add(self.unclaimed, accrued)?;
        self.reward_debt = reward_owed(self.staked_amount, acc_reward_per_share)?;
        Ok(accrued)
    }

    /// Recompute the debt for the current stake at accumulator `acc`
    pub fn rebase_debt(&mut self, acc_reward_per_share: u128) -> FarmResult<()> {
        self.reward_debt = reward_owed(self.staked_amount, acc_reward_per_share)?;
        Ok(())
    }
}

// ============ Actions ============

/// Operations accepted by the farm engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum FarmAction {
    /// Stake `amount` of the pool's asset
    Deposit { pool_index: PoolIndex, amount: u64 },
    /// Unstake `amount`, keeping earned reward claimable
    Withdraw { pool_index: PoolIndex, amount: u64 },
    /// Unstake everything, forfeiting pending reward
    EmergencyWithdraw { pool_index: PoolIndex },
    /// Claim `amount` of pending reward
    Claim { pool_index: PoolIndex, amount: u64 },
    /// Operator: add reward units to the budget
    FundRewards { amount: u64 },
    /// Operator: append a pool
    RegisterPool {
        stake_asset: AssetId,
        weight: u64,
        checkpoint_all: bool,
    },
    /// Operator: change a pool's weight
    SetPoolWeight {
        pool_index: PoolIndex,
        weight: u64,
        checkpoint_all: bool,
    },
    /// Bring one pool's accumulator current
    Checkpoint { pool_index: PoolIndex },
    /// Bring every pool's accumulator current
    CheckpointAll,
}

impl FarmAction {
    /// Returns true for operator-only actions
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Self::FundRewards { .. } | Self::RegisterPool { .. } | Self::SetPoolWeight { .. }
        )
    }
}
