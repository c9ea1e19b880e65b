//! Accounting Engine
//!
//! Owns the farm state and moves stake and reward through the external
//! asset ledger. Every operation follows the same shape:
//!
//! 1. checkpoint the pool on a copy
//! 2. settle and update the position on a copy
//! 3. move assets
//! 4. commit the copies and emit events
//!
//! A failure in any step returns before the commit, so the state is left
//! exactly as it was.

use stackfarm_common::{
    clock::BlockClock,
    errors::{FarmError, FarmResult, TransferFailure},
    events::{EventLog, FarmEvent},
    math::{safe_add, safe_sub},
    token_ops::AssetService,
    types::{Address, AssetId, FarmAction, Pool, PoolIndex, PoolInfo, UserPosition},
};

use crate::emission::{project_accumulator, Accrual};
use crate::registry::CheckpointReport;
use crate::{FarmConfig, FarmState};

// ============ Results ============

/// Outcome of a deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositResult {
    pub position: UserPosition,
    /// Reward moved into `unclaimed` by this deposit
    pub reward_settled: u64,
    pub new_pool_total: u64,
}

/// Outcome of a withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawResult {
    pub amount_withdrawn: u64,
    pub reward_settled: u64,
    pub remaining_stake: u64,
    pub new_pool_total: u64,
}

/// Outcome of an emergency withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyWithdrawResult {
    pub amount: u64,
    pub reward_forfeited: u64,
}

/// Outcome of a reward claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimResult {
    pub amount: u64,
    pub remaining_pending: u64,
}

/// Aggregate figures for dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmStats {
    pub pool_count: u32,
    pub total_allocation_weight: u64,
    pub reward_budget: u64,
    pub total_rewards_paid: u64,
    pub total_rewards_funded: u64,
    pub active_positions: usize,
}

// ============ Engine ============

/// Multi-pool staking ledger bound to an asset service and a clock
///
/// Events accumulate in memory until the embedder takes them with
/// [`FarmEngine::drain_events`]; a long-running owner must drain after
/// each batch of operations.
#[derive(Debug)]
pub struct FarmEngine<A: AssetService, C: BlockClock> {
    state: FarmState,
    assets: A,
    clock: C,
    events: EventLog,
}

impl<A: AssetService, C: BlockClock> FarmEngine<A, C> {
    /// Create an engine with an empty registry
    pub fn new(config: FarmConfig, assets: A, clock: C) -> FarmResult<Self> {
        Ok(Self::from_state(FarmState::new(config)?, assets, clock))
    }

    /// Resume from an existing state
    pub fn from_state(state: FarmState, assets: A, clock: C) -> Self {
        Self {
            state,
            assets,
            clock,
            events: EventLog::new(),
        }
    }

    /// Resume from bytes written by [`FarmEngine::snapshot`]
    pub fn restore(bytes: &[u8], assets: A, clock: C) -> FarmResult<Self> {
        Ok(Self::from_state(FarmState::from_bytes(bytes)?, assets, clock))
    }

    /// Serialized state for storage
    pub fn snapshot(&self) -> FarmResult<Vec<u8>> {
        self.state.to_bytes()
    }

    // ============ User Operations ============

    /// Stake `amount` of the pool's asset for `user`
    ///
    /// Reward earned so far is settled into the position but not paid.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount == 0`
    /// - `InvalidIndex` for an unknown pool
    /// - `TransferFailed` if the stake cannot be pulled from `user`
    pub fn deposit(
        &mut self,
        pool_index: PoolIndex,
        user: &Address,
        amount: u64,
    ) -> FarmResult<DepositResult> {
        if amount == 0 {
            return Err(FarmError::ZeroAmount);
        }
        let now = self.clock.current_height();
        let (mut pool, accrual) = self.checkpointed_pool(pool_index, now)?;
        let acc = pool.acc_reward_per_share;

        let mut position = self
            .state
            .position(pool_index, user)
            .cloned()
            .unwrap_or_else(|| UserPosition::new(now));
        let was_staked = position.is_staked();

        let reward_settled = position.settle(acc)?;
        position.staked_amount = safe_add(position.staked_amount, amount)?;
        position.rebase_debt(acc)?;
        position.last_updated_block = now;

        pool.total_staked = safe_add(pool.total_staked, amount)?;
        if !was_staked {
            pool.staker_count = safe_add(pool.staker_count, 1)?;
        }

        let custody = self.custody();
        self.pull(&pool.stake_asset, user, &custody, amount)?;

        let new_pool_total = pool.total_staked;
        self.commit(pool_index, pool, &accrual, now);
        self.state.positions.insert((pool_index, *user), position.clone());

        log::debug!("deposit pool={} amount={} total={}", pool_index, amount, new_pool_total);
        self.events.emit(FarmEvent::Deposited {
            pool_index,
            user: *user,
            amount,
            new_stake: position.staked_amount,
            pool_total: new_pool_total,
            block_height: now,
        });

        Ok(DepositResult {
            position,
            reward_settled,
            new_pool_total,
        })
    }

    /// Unstake `amount` for `user`; earned reward stays claimable
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount == 0`
    /// - `InvalidIndex` for an unknown pool
    /// - `InsufficientStake` if `amount` exceeds the position's stake
    /// - `TransferFailed` if the custody account cannot pay out
    pub fn withdraw(
        &mut self,
        pool_index: PoolIndex,
        user: &Address,
        amount: u64,
    ) -> FarmResult<WithdrawResult> {
        if amount == 0 {
            return Err(FarmError::ZeroAmount);
        }
        let now = self.clock.current_height();
        let (mut pool, accrual) = self.checkpointed_pool(pool_index, now)?;
        let acc = pool.acc_reward_per_share;

        let mut position = self.staked_position(pool_index, user, amount)?;

        let reward_settled = position.settle(acc)?;
        position.staked_amount -= amount;
        position.rebase_debt(acc)?;
        position.last_updated_block = now;

        pool.total_staked = safe_sub(pool.total_staked, amount)?;
        if !position.is_staked() {
            pool.staker_count = pool.staker_count.saturating_sub(1);
        }

        self.pay(&pool.stake_asset, user, amount)?;

        let new_pool_total = pool.total_staked;
        let remaining_stake = position.staked_amount;
        self.commit(pool_index, pool, &accrual, now);
        self.state.positions.insert((pool_index, *user), position);

        log::debug!("withdraw pool={} amount={} total={}", pool_index, amount, new_pool_total);
        self.events.emit(FarmEvent::Withdrawn {
            pool_index,
            user: *user,
            amount,
            new_stake: remaining_stake,
            pool_total: new_pool_total,
            block_height: now,
        });

        Ok(WithdrawResult {
            amount_withdrawn: amount,
            reward_settled,
            remaining_stake,
            new_pool_total,
        })
    }

    /// Return the whole stake to `user`, forfeiting all pending reward
    ///
    /// # Errors
    /// - `InvalidIndex` for an unknown pool
    /// - `InsufficientStake` if the position holds nothing
    /// - `TransferFailed` if the custody account cannot pay out
    pub fn emergency_withdraw(
        &mut self,
        pool_index: PoolIndex,
        user: &Address,
    ) -> FarmResult<EmergencyWithdrawResult> {
        let now = self.clock.current_height();
        let (mut pool, accrual) = self.checkpointed_pool(pool_index, now)?;

        let mut position = self.staked_position(pool_index, user, 0)?;
        let amount = position.staked_amount;
        // Informational; saturates instead of failing
        let reward_forfeited = position.pending_saturating(pool.acc_reward_per_share);

        position.staked_amount = 0;
        position.reward_debt = 0;
        position.unclaimed = 0;
        position.last_updated_block = now;

        pool.total_staked = safe_sub(pool.total_staked, amount)?;
        pool.staker_count = pool.staker_count.saturating_sub(1);

        self.pay(&pool.stake_asset, user, amount)?;

        self.commit(pool_index, pool, &accrual, now);
        self.state.positions.insert((pool_index, *user), position);

        log::warn!(
            "emergency withdraw pool={} amount={} forfeited={}",
            pool_index, amount, reward_forfeited
        );
        self.events.emit(FarmEvent::EmergencyWithdrawn {
            pool_index,
            user: *user,
            amount,
            reward_forfeited,
            block_height: now,
        });

        Ok(EmergencyWithdrawResult {
            amount,
            reward_forfeited,
        })
    }

    /// Pay `amount` of pending reward to `user`
    ///
    /// Afterwards the position's pending reward is exactly the pending
    /// reward at this block minus `amount`.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount == 0`
    /// - `InvalidIndex` for an unknown pool
    /// - `ExceedsPending` if `amount` is more than the user has earned
    /// - `InsufficientRewardBudget` if the funded budget cannot cover it
    /// - `TransferFailed` if the reward cannot be paid
    pub fn distribute_reward(
        &mut self,
        pool_index: PoolIndex,
        user: &Address,
        amount: u64,
    ) -> FarmResult<ClaimResult> {
        if amount == 0 {
            return Err(FarmError::ZeroAmount);
        }
        let now = self.clock.current_height();
        let (pool, accrual) = self.checkpointed_pool(pool_index, now)?;
        let acc = pool.acc_reward_per_share;

        let mut position = self
            .state
            .position(pool_index, user)
            .cloned()
            .unwrap_or_else(|| UserPosition::new(now));

        let pending = position.pending(acc)?;
        if amount > pending {
            log::warn!("claim rejected: {} exceeds pending {}", amount, pending);
            return Err(FarmError::ExceedsPending {
                pending,
                requested: amount,
            });
        }
        if amount > self.state.reward_budget {
            log::warn!("claim rejected: budget {} < {}", self.state.reward_budget, amount);
            return Err(FarmError::InsufficientRewardBudget {
                budget: self.state.reward_budget,
                requested: amount,
            });
        }

        position.settle(acc)?;
        position.unclaimed = safe_sub(position.unclaimed, amount)?;
        position.total_claimed = safe_add(position.total_claimed, amount)?;
        position.last_updated_block = now;
        let remaining_pending = position.unclaimed;

        let reward_budget = self.state.reward_budget - amount;
        let total_rewards_paid = safe_add(self.state.total_rewards_paid, amount)?;

        let reward_asset = self.state.config.reward_asset;
        self.pay(&reward_asset, user, amount)?;

        self.commit(pool_index, pool, &accrual, now);
        self.state.positions.insert((pool_index, *user), position);
        self.state.reward_budget = reward_budget;
        self.state.total_rewards_paid = total_rewards_paid;

        log::debug!("claim pool={} amount={} remaining={}", pool_index, amount, remaining_pending);
        self.events.emit(FarmEvent::RewardClaimed {
            pool_index,
            user: *user,
            amount,
            remaining_pending,
            block_height: now,
        });

        Ok(ClaimResult {
            amount,
            remaining_pending,
        })
    }

    /// Claim everything `user` has earned in the pool
    ///
    /// # Errors
    /// `NoRewardsToClaim` if nothing is pending, otherwise as
    /// [`FarmEngine::distribute_reward`]
    pub fn claim_all(&mut self, pool_index: PoolIndex, user: &Address) -> FarmResult<ClaimResult> {
        let pending = self.pending_reward(pool_index, user)?;
        if pending == 0 {
            return Err(FarmError::NoRewardsToClaim);
        }
        self.distribute_reward(pool_index, user, pending)
    }

    // ============ Operator Operations ============

    /// Pull `amount` of reward asset from `caller` into the budget
    pub fn fund_rewards(&mut self, caller: &Address, amount: u64) -> FarmResult<u64> {
        self.require_admin(caller)?;
        if amount == 0 {
            return Err(FarmError::ZeroAmount);
        }
        let now = self.clock.current_height();
        let new_budget = safe_add(self.state.reward_budget, amount)?;
        let total_funded = safe_add(self.state.total_rewards_funded, amount)?;

        let reward_asset = self.state.config.reward_asset;
        let custody = self.custody();
        self.pull(&reward_asset, caller, &custody, amount)?;

        self.state.reward_budget = new_budget;
        self.state.total_rewards_funded = total_funded;

        log::info!("rewards funded amount={} budget={}", amount, new_budget);
        self.events.emit(FarmEvent::RewardsFunded {
            funder: *caller,
            amount,
            new_budget,
            block_height: now,
        });
        Ok(new_budget)
    }

    /// Append a pool accepting `stake_asset` with `weight`
    pub fn register_pool(
        &mut self,
        caller: &Address,
        stake_asset: AssetId,
        weight: u64,
        also_checkpoint_all: bool,
    ) -> FarmResult<PoolIndex> {
        self.require_admin(caller)?;
        let now = self.clock.current_height();

        let mut next = self.state.clone();
        let (pool_index, reports) = next.register_pool(stake_asset, weight, also_checkpoint_all, now)?;
        self.state = next;

        self.emit_checkpoints(&reports, now);
        log::info!("pool {} registered weight={} total={}", pool_index, weight, self.state.total_allocation_weight);
        self.events.emit(FarmEvent::PoolRegistered {
            pool_index,
            stake_asset,
            weight,
            total_allocation_weight: self.state.total_allocation_weight,
            block_height: now,
        });
        Ok(pool_index)
    }

    /// Change a pool's allocation weight, returning the previous one
    pub fn set_pool_weight(
        &mut self,
        caller: &Address,
        pool_index: PoolIndex,
        weight: u64,
        also_checkpoint_all: bool,
    ) -> FarmResult<u64> {
        self.require_admin(caller)?;
        let now = self.clock.current_height();

        let mut next = self.state.clone();
        let (old_weight, reports) = next.set_pool_weight(pool_index, weight, also_checkpoint_all, now)?;
        self.state = next;

        self.emit_checkpoints(&reports, now);
        log::info!("pool {} weight {} -> {}", pool_index, old_weight, weight);
        self.events.emit(FarmEvent::PoolWeightUpdated {
            pool_index,
            old_weight,
            new_weight: weight,
            total_allocation_weight: self.state.total_allocation_weight,
            block_height: now,
        });
        Ok(old_weight)
    }

    // ============ Checkpoints ============

    /// Bring one pool current, returning the reward it received
    pub fn checkpoint(&mut self, pool_index: PoolIndex) -> FarmResult<u64> {
        let now = self.clock.current_height();
        let report = self.state.checkpoint(pool_index, now)?;
        self.emit_checkpoints(&[report], now);
        Ok(report.pool_reward)
    }

    /// Bring every pool current
    pub fn checkpoint_all(&mut self) -> FarmResult<()> {
        let now = self.clock.current_height();
        let reports = self.state.checkpoint_all(now)?;
        self.emit_checkpoints(&reports, now);
        Ok(())
    }

    /// Apply `action` on behalf of `caller`
    pub fn execute(&mut self, caller: &Address, action: FarmAction) -> FarmResult<()> {
        match action {
            FarmAction::Deposit { pool_index, amount } => {
                self.deposit(pool_index, caller, amount).map(|_| ())
            }
            FarmAction::Withdraw { pool_index, amount } => {
                self.withdraw(pool_index, caller, amount).map(|_| ())
            }
            FarmAction::EmergencyWithdraw { pool_index } => {
                self.emergency_withdraw(pool_index, caller).map(|_| ())
            }
            FarmAction::Claim { pool_index, amount } => {
                self.distribute_reward(pool_index, caller, amount).map(|_| ())
            }
            FarmAction::FundRewards { amount } => self.fund_rewards(caller, amount).map(|_| ()),
            FarmAction::RegisterPool {
                stake_asset,
                weight,
                checkpoint_all,
            } => self
                .register_pool(caller, stake_asset, weight, checkpoint_all)
                .map(|_| ()),
            FarmAction::SetPoolWeight {
                pool_index,
                weight,
                checkpoint_all,
            } => self
                .set_pool_weight(caller, pool_index, weight, checkpoint_all)
                .map(|_| ()),
            FarmAction::Checkpoint { pool_index } => self.checkpoint(pool_index).map(|_| ()),
            FarmAction::CheckpointAll => self.checkpoint_all(),
        }
    }

    // ============ Queries ============

    /// Reward `user` could claim in the pool right now
    ///
    /// Projects the accumulator to the current block without writing it.
    pub fn pending_reward(&self, pool_index: PoolIndex, user: &Address) -> FarmResult<u64> {
        let pool = self.state.pool(pool_index)?;
        let Some(position) = self.state.position(pool_index, user) else {
            return Ok(0);
        };
        let acc = project_accumulator(
            pool,
            &self.state.config,
            self.state.total_allocation_weight,
            self.clock.current_height(),
        )?;
        position.pending(acc)
    }

    pub fn pool_length(&self) -> u32 {
        self.state.pool_count()
    }

    pub fn total_allocation_weight(&self) -> u64 {
        self.state.total_allocation_weight
    }

    pub fn reward_budget(&self) -> u64 {
        self.state.reward_budget
    }

    pub fn user_position(&self, pool_index: PoolIndex, user: &Address) -> Option<UserPosition> {
        self.state.position(pool_index, user).cloned()
    }

    pub fn pool_info(&self, pool_index: PoolIndex) -> FarmResult<PoolInfo> {
        self.state.pool(pool_index).map(Pool::info)
    }

    pub fn config(&self) -> &FarmConfig {
        &self.state.config
    }

    pub fn state(&self) -> &FarmState {
        &self.state
    }

    /// Custody account on the asset ledger
    pub fn custody(&self) -> Address {
        self.state.config.custody_address()
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hand collected events to the embedder, emptying the log
    pub fn drain_events(&mut self) -> Vec<FarmEvent> {
        self.events.drain()
    }

    pub fn farm_stats(&self) -> FarmStats {
        FarmStats {
            pool_count: self.state.pool_count(),
            total_allocation_weight: self.state.total_allocation_weight,
            reward_budget: self.state.reward_budget,
            total_rewards_paid: self.state.total_rewards_paid,
            total_rewards_funded: self.state.total_rewards_funded,
            active_positions: self.state.active_positions(),
        }
    }

    // ============ Internal Helpers ============

    fn require_admin(&self, caller: &Address) -> FarmResult<()> {
        if *caller != self.state.config.admin {
            log::warn!("operator action refused for non-admin caller");
            return Err(FarmError::AdminOnly { caller: *caller });
        }
        Ok(())
    }

    /// Copy of the pool with its accrual at `now` applied
    fn checkpointed_pool(&self, pool_index: PoolIndex, now: u64) -> FarmResult<(Pool, Accrual)> {
        let accrual = self.state.accrual(pool_index, now)?;
        let mut pool = self.state.pool(pool_index)?.clone();
        accrual.apply(&mut pool);
        Ok((pool, accrual))
    }

    /// Copy of a position holding at least `amount`, and at least one unit
    fn staked_position(
        &self,
        pool_index: PoolIndex,
        user: &Address,
        amount: u64,
    ) -> FarmResult<UserPosition> {
        let position = self
            .state
            .position(pool_index, user)
            .cloned()
            .unwrap_or_default();
        if !position.is_staked() || amount > position.staked_amount {
            log::warn!(
                "withdraw rejected: staked {} < requested {}",
                position.staked_amount, amount
            );
            return Err(FarmError::InsufficientStake {
                staked: position.staked_amount,
                requested: amount,
            });
        }
        Ok(position)
    }

    fn commit(&mut self, pool_index: PoolIndex, pool: Pool, accrual: &Accrual, now: u64) {
        let report = CheckpointReport {
            pool_index,
            pool_reward: accrual.pool_reward,
            acc_reward_per_share: accrual.acc_reward_per_share,
        };
        if let Some(slot) = self.state.pools.get_mut(pool_index as usize) {
            *slot = pool;
        }
        self.emit_checkpoints(&[report], now);
    }

    fn emit_checkpoints(&mut self, reports: &[CheckpointReport], now: u64) {
        for report in reports.iter().filter(|r| r.pool_reward > 0) {
            self.events.emit(FarmEvent::PoolCheckpointed {
                pool_index: report.pool_index,
                pool_reward: report.pool_reward,
                acc_reward_per_share: report.acc_reward_per_share,
                block_height: now,
            });
        }
    }

    fn pull(&mut self, asset: &AssetId, payer: &Address, recipient: &Address, amount: u64) -> FarmResult<()> {
        self.assets
            .transfer_from(asset, payer, recipient, amount)
            .map_err(|err| as_transfer_failure(err, asset, payer, recipient, amount))
    }

    fn pay(&mut self, asset: &AssetId, recipient: &Address, amount: u64) -> FarmResult<()> {
        let custody = self.custody();
        self.assets
            .transfer(asset, recipient, amount)
            .map_err(|err| as_transfer_failure(err, asset, &custody, recipient, amount))
    }
}

/// Surface any asset-service error as `TransferFailed`
fn as_transfer_failure(
    err: FarmError,
    asset: &AssetId,
    from: &Address,
    to: &Address,
    amount: u64,
) -> FarmError {
    match err {
        FarmError::TransferFailed { .. } => err,
        other => {
            log::warn!("asset service error {}: {}", other.code(), other);
            FarmError::TransferFailed {
                asset: *asset,
                from: *from,
                to: *to,
                amount,
                reason: TransferFailure::Rejected,
            }
        }
    }
}
