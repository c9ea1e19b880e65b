//! Fixed-Point Math for reward accrual
//!
//! Reward-per-share values are stored scaled by [`SCALE`]. Every owed
//! amount is computed multiply-before-divide and truncated toward zero;
//! the lost remainder always stays with the reward pool.
//!
//! `stake * acc` and `reward * SCALE` are formed in 256 bits. The
//! accumulator keeps the whole reward history of a pool, so after a long
//! stretch with a tiny stake it can be large enough that a later big
//! deposit would not fit a u128 product.

use primitive_types::U256;

use crate::constants::precision::SCALE;
use crate::errors::{FarmError, FarmResult};

/// Narrow a 256-bit intermediate back to u128
fn narrow(value: U256) -> FarmResult<u128> {
    if value.bits() > 128 {
        return Err(FarmError::Overflow);
    }
    Ok(value.low_u128())
}

/// Scale a reward amount up into accumulator precision
pub fn scale_up(amount: u64) -> u128 {
    // u64::MAX * 1e12 < u128::MAX, cannot overflow
    amount as u128 * SCALE
}

/// Scale an accumulator-precision value down to whole reward units
///
/// Truncates toward zero. Values that do not fit in u64 are an overflow.
pub fn scale_down(value: u128) -> FarmResult<u64> {
    u64::try_from(value / SCALE).map_err(|_| FarmError::Overflow)
}

/// Narrow a reward-unit amount to u64
pub fn to_units(value: u128) -> FarmResult<u64> {
    u64::try_from(value).map_err(|_| FarmError::Overflow)
}

/// Reward owed to `staked` units at accumulator `acc_reward_per_share`
///
/// owed = staked * acc / SCALE, in whole reward units. The result is the
/// gross figure a reward debt is measured against, so it stays u128.
pub fn reward_owed(staked: u64, acc_reward_per_share: u128) -> FarmResult<u128> {
    let gross = U256::from(staked)
        .checked_mul(U256::from(acc_reward_per_share))
        .ok_or(FarmError::Overflow)?;
    narrow(gross / U256::from(SCALE))
}

/// Accumulator increment for distributing `reward` over `total_staked`
///
/// increment = reward * SCALE / total_staked
pub fn reward_per_share(reward: u64, total_staked: u64) -> FarmResult<u128> {
    if total_staked == 0 {
        return Err(FarmError::DivisionByZero);
    }
    let scaled = U256::from(reward)
        .checked_mul(U256::from(SCALE))
        .ok_or(FarmError::Overflow)?;
    narrow(scaled / U256::from(total_staked))
}

/// Reward emitted to one pool over `blocks`
///
/// pool_reward = blocks * emission_per_block * weight / total_weight
///
/// A farm without weight emits nothing. The division remainder is dropped
/// rather than banked, so many small pools slightly under-emit.
pub fn pool_emission(
    blocks: u64,
    emission_per_block: u64,
    weight: u64,
    total_weight: u64,
) -> FarmResult<u64> {
    if total_weight == 0 || blocks == 0 {
        return Ok(0);
    }

    let reward = (blocks as u128)
        .checked_mul(emission_per_block as u128)
        .ok_or(FarmError::Overflow)?
        .checked_mul(weight as u128)
        .ok_or(FarmError::Overflow)?
        .checked_div(total_weight as u128)
        .ok_or(FarmError::DivisionByZero)?;

    u64::try_from(reward).map_err(|_| FarmError::Overflow)
}

/// Number of emitting blocks between two checkpoints
///
/// Blocks before `start_block` never emit.
pub fn emission_window(last_checkpoint: u64, now: u64, start_block: u64) -> u64 {
    let from = last_checkpoint.max(start_block);
    now.saturating_sub(from)
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> FarmResult<u64> {
    a.checked_add(b).ok_or(FarmError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> FarmResult<u64> {
    a.checked_sub(b).ok_or(FarmError::Underflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_round_trip_truncates() {
        assert_eq!(scale_down(scale_up(42)).unwrap(), 42);
        // 1.999... units truncates to 1
        assert_eq!(scale_down(2 * SCALE - 1).unwrap(), 1);
        assert_eq!(scale_down(SCALE - 1).unwrap(), 0);
    }

    #[test]
    fn test_scale_down_overflow() {
        let too_big = (u64::MAX as u128 + 1) * SCALE;
        assert_eq!(scale_down(too_big), Err(FarmError::Overflow));
    }

    #[test]
    fn test_reward_owed() {
        // 12 reward units over 1000 staked: acc = 12e12 / 1000 = 12e9
        let acc = reward_per_share(12, 1000).unwrap();
        assert_eq!(acc, 12_000_000_000);
        assert_eq!(reward_owed(1000, acc).unwrap(), 12);
        assert_eq!(reward_owed(500, acc).unwrap(), 6);
        // 1 unit of stake earns 0.012 -> 0
        assert_eq!(reward_owed(1, acc).unwrap(), 0);
    }

    #[test]
    fn test_reward_owed_overflow() {
        assert_eq!(reward_owed(u64::MAX, u128::MAX), Err(FarmError::Overflow));
    }

    #[test]
    fn test_reward_owed_wide_product() {
        // 1e15 * 1e24 does not fit a u128 product, the owed amount does
        let acc = 1_000_000_000_000_000_000_000_000u128;
        assert_eq!(
            reward_owed(1_000_000_000_000_000, acc).unwrap(),
            1_000_000_000_000_000_000_000_000_000
        );
        assert_eq!(reward_owed(u64::MAX, acc).unwrap(), u64::MAX as u128 * 1_000_000_000_000);
    }

    #[test]
    fn test_to_units() {
        assert_eq!(to_units(42).unwrap(), 42);
        assert_eq!(to_units(u64::MAX as u128 + 1), Err(FarmError::Overflow));
    }

    #[test]
    fn test_reward_per_share_empty_pool() {
        assert_eq!(reward_per_share(10, 0), Err(FarmError::DivisionByZero));
    }

    #[test]
    fn test_pool_emission_split_by_weight() {
        // 10 blocks * 30/block, pool holds 1 of 3 weight
        assert_eq!(pool_emission(10, 30, 1, 3).unwrap(), 100);
        assert_eq!(pool_emission(10, 30, 2, 3).unwrap(), 200);
        // Truncation: 1 block * 10 * 1 / 3 = 3.33 -> 3
        assert_eq!(pool_emission(1, 10, 1, 3).unwrap(), 3);
    }

    #[test]
    fn test_pool_emission_zero_weight() {
        assert_eq!(pool_emission(10, 30, 0, 0).unwrap(), 0);
        assert_eq!(pool_emission(10, 30, 0, 5).unwrap(), 0);
        assert_eq!(pool_emission(0, 30, 5, 5).unwrap(), 0);
    }

    #[test]
    fn test_emission_window() {
        assert_eq!(emission_window(10, 15, 0), 5);
        assert_eq!(emission_window(10, 10, 0), 0);
        // Start block clamps the window
        assert_eq!(emission_window(0, 15, 12), 3);
        assert_eq!(emission_window(0, 11, 12), 0);
    }

    #[test]
    fn test_safe_math() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert_eq!(safe_add(u64::MAX, 1), Err(FarmError::Overflow));
        assert_eq!(safe_sub(1, 2), Err(FarmError::Underflow));
    }
}
