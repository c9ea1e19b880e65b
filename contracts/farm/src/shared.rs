//! Shared farm handle
//!
//! `FarmEngine` takes `&mut self` for every operation. Embedders that
//! serve several callers wrap it in a [`SharedFarm`]: each call holds the
//! lock for its whole duration, so a checkpoint and the read or mutation
//! that follows it can never interleave with another caller.

use std::sync::Arc;

use parking_lot::Mutex;

use stackfarm_common::{
    clock::BlockClock,
    errors::FarmResult,
    events::FarmEvent,
    token_ops::AssetService,
    types::{Address, AssetId, FarmAction, PoolIndex, PoolInfo, UserPosition},
};

use crate::engine::{ClaimResult, DepositResult, EmergencyWithdrawResult, FarmEngine, FarmStats, WithdrawResult};

/// Cloneable, lock-serialized handle to one engine
///
/// Events stay in the engine's log until some clone calls
/// [`SharedFarm::drain_events`].
pub struct SharedFarm<A: AssetService, C: BlockClock> {
    inner: Arc<Mutex<FarmEngine<A, C>>>,
}

impl<A: AssetService, C: BlockClock> Clone for SharedFarm<A, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AssetService, C: BlockClock> SharedFarm<A, C> {
    pub fn new(engine: FarmEngine<A, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut FarmEngine<A, C>) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }

    pub fn deposit(&self, pool_index: PoolIndex, user: &Address, amount: u64) -> FarmResult<DepositResult> {
        self.inner.lock().deposit(pool_index, user, amount)
    }

    pub fn withdraw(&self, pool_index: PoolIndex, user: &Address, amount: u64) -> FarmResult<WithdrawResult> {
        self.inner.lock().withdraw(pool_index, user, amount)
    }

    pub fn emergency_withdraw(&self, pool_index: PoolIndex, user: &Address) -> FarmResult<EmergencyWithdrawResult> {
        self.inner.lock().emergency_withdraw(pool_index, user)
    }

    pub fn distribute_reward(&self, pool_index: PoolIndex, user: &Address, amount: u64) -> FarmResult<ClaimResult> {
        self.inner.lock().distribute_reward(pool_index, user, amount)
    }

    pub fn claim_all(&self, pool_index: PoolIndex, user: &Address) -> FarmResult<ClaimResult> {
        self.inner.lock().claim_all(pool_index, user)
    }

    pub fn fund_rewards(&self, caller: &Address, amount: u64) -> FarmResult<u64> {
        self.inner.lock().fund_rewards(caller, amount)
    }

    pub fn register_pool(
        &self,
        caller: &Address,
        stake_asset: AssetId,
        weight: u64,
        also_checkpoint_all: bool,
    ) -> FarmResult<PoolIndex> {
        self.inner
            .lock()
            .register_pool(caller, stake_asset, weight, also_checkpoint_all)
    }

    pub fn set_pool_weight(
        &self,
        caller: &Address,
        pool_index: PoolIndex,
        weight: u64,
        also_checkpoint_all: bool,
    ) -> FarmResult<u64> {
        self.inner
            .lock()
            .set_pool_weight(caller, pool_index, weight, also_checkpoint_all)
    }

    pub fn checkpoint(&self, pool_index: PoolIndex) -> FarmResult<u64> {
        self.inner.lock().checkpoint(pool_index)
    }

    pub fn checkpoint_all(&self) -> FarmResult<()> {
        self.inner.lock().checkpoint_all()
    }

    pub fn execute(&self, caller: &Address, action: FarmAction) -> FarmResult<()> {
        self.inner.lock().execute(caller, action)
    }

    pub fn pending_reward(&self, pool_index: PoolIndex, user: &Address) -> FarmResult<u64> {
        self.inner.lock().pending_reward(pool_index, user)
    }

    pub fn pool_length(&self) -> u32 {
        self.inner.lock().pool_length()
    }

    pub fn total_allocation_weight(&self) -> u64 {
        self.inner.lock().total_allocation_weight()
    }

    pub fn reward_budget(&self) -> u64 {
        self.inner.lock().reward_budget()
    }

    pub fn user_position(&self, pool_index: PoolIndex, user: &Address) -> Option<UserPosition> {
        self.inner.lock().user_position(pool_index, user)
    }

    pub fn pool_info(&self, pool_index: PoolIndex) -> FarmResult<PoolInfo> {
        self.inner.lock().pool_info(pool_index)
    }

    pub fn farm_stats(&self) -> FarmStats {
        self.inner.lock().farm_stats()
    }

    pub fn snapshot(&self) -> FarmResult<Vec<u8>> {
        self.inner.lock().snapshot()
    }

    pub fn drain_events(&self) -> Vec<FarmEvent> {
        self.inner.lock().drain_events()
    }
}
